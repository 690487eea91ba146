//! Vertex buffer layouts
//!
//! Describes how interleaved vertex or instance data maps onto shader input
//! attributes. Offsets and stride are computed once when the layout is built.

/// Shader input data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDataType {
    /// `float`
    Float,
    /// `vec2`
    Float2,
    /// `vec3`
    Float3,
    /// `vec4`
    Float4,
    /// `mat4`, bound as four consecutive `vec4` attributes
    Mat4,
    /// `int`
    Int,
}

impl ShaderDataType {
    /// Size in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::Float => 4,
            Self::Float2 => 4 * 2,
            Self::Float3 => 4 * 3,
            Self::Float4 => 4 * 4,
            Self::Mat4 => 4 * 4 * 4,
            Self::Int => 4,
        }
    }

    /// Number of scalar components
    pub fn component_count(self) -> u32 {
        match self {
            Self::Float | Self::Int => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Mat4 => 16,
        }
    }

    /// Number of attribute locations the type occupies
    pub fn attribute_slots(self) -> u32 {
        match self {
            Self::Mat4 => 4,
            _ => 1,
        }
    }
}

/// A single named attribute within a layout
#[derive(Debug, Clone, PartialEq)]
pub struct BufferElement {
    /// Attribute name as seen by the shader
    pub name: String,
    /// Data type
    pub data_type: ShaderDataType,
    /// Byte offset from the start of a vertex
    pub offset: u32,
    /// Whether integer data should be normalized
    pub normalized: bool,
}

impl BufferElement {
    /// Create an element; the offset is assigned by [`BufferLayout::new`]
    pub fn new(data_type: ShaderDataType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            offset: 0,
            normalized: false,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        self.data_type.size()
    }
}

/// Ordered attribute list with computed offsets and stride
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferLayout {
    elements: Vec<BufferElement>,
    stride: u32,
}

impl BufferLayout {
    /// Build a layout, assigning tightly packed offsets in order
    pub fn new(elements: Vec<BufferElement>) -> Self {
        let mut elements = elements;
        let mut offset = 0;
        for element in &mut elements {
            element.offset = offset;
            offset += element.size();
        }
        Self { elements, stride: offset }
    }

    /// Elements in declaration order
    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    /// Bytes between consecutive vertices
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Total attribute locations used, counting a `Mat4` as four
    pub fn attribute_slots(&self) -> u32 {
        self.elements.iter().map(|e| e.data_type.attribute_slots()).sum()
    }

    /// True when the layout has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl From<Vec<BufferElement>> for BufferLayout {
    fn from(elements: Vec<BufferElement>) -> Self {
        Self::new(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_stride() {
        let layout = BufferLayout::new(vec![
            BufferElement::new(ShaderDataType::Float3, "a_Position"),
            BufferElement::new(ShaderDataType::Float4, "a_Color"),
            BufferElement::new(ShaderDataType::Int, "a_EntityID"),
        ]);

        let offsets: Vec<u32> = layout.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.attribute_slots(), 3);
    }

    #[test]
    fn test_mat4_uses_four_slots() {
        let layout = BufferLayout::new(vec![
            BufferElement::new(ShaderDataType::Mat4, "a_InstanceMatrix"),
            BufferElement::new(ShaderDataType::Float4, "a_InstanceColor"),
            BufferElement::new(ShaderDataType::Float4, "a_InstanceCustomData"),
        ]);

        assert_eq!(layout.stride(), 96);
        assert_eq!(layout.attribute_slots(), 6);
        assert_eq!(layout.elements()[2].offset, 80);
    }
}
