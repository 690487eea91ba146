//! Debug line batching
//!
//! Lines accumulate on the CPU during a scene and go to the GPU in a single
//! upload and draw when the scene ends.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::api::{
    BufferElement, BufferHandle, BufferLayout, GraphicsDevice, ShaderDataType, ShaderHandle, VertexArrayHandle,
};
use crate::render::shaders;
use crate::render::RenderResult;

/// Edges of a box as index pairs into its eight corners
///
/// Corners 0-3 are the bottom face, 4-7 the top face.
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

/// Corners of a unit cube centered on the origin, in [`BOX_EDGES`] order
const UNIT_BOX_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
    [-0.5, -0.5, 0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

/// One endpoint of a debug line (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    /// World-space position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [f32; 4],
    /// Entity id written to the picking attachment
    pub entity_id: i32,
}

impl LineVertex {
    /// Attribute layout of the line stream
    pub fn layout() -> BufferLayout {
        BufferLayout::new(vec![
            BufferElement::new(ShaderDataType::Float3, "a_Position"),
            BufferElement::new(ShaderDataType::Float4, "a_Color"),
            BufferElement::new(ShaderDataType::Int, "a_EntityID"),
        ])
    }
}

#[derive(Debug, Clone, Copy)]
struct LineResources {
    shader: ShaderHandle,
    vertex_buffer: BufferHandle,
    vertex_array: VertexArrayHandle,
}

/// CPU-side line list plus the device objects that draw it
#[derive(Debug)]
pub struct LineBatch {
    vertices: Vec<LineVertex>,
    max_vertices: usize,
    line_width: f32,
    resources: Option<LineResources>,
    overflow_reported: bool,
}

impl LineBatch {
    /// Create a batch holding at most `max_vertices` endpoints
    pub fn new(max_vertices: usize, line_width: f32) -> Self {
        Self {
            vertices: Vec::new(),
            max_vertices: max_vertices.max(2),
            line_width,
            resources: None,
            overflow_reported: false,
        }
    }

    /// Create the line shader, vertex buffer and vertex array
    pub fn init(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let shader = device.create_shader(shaders::LINE.name, shaders::LINE.vertex, shaders::LINE.fragment)?;
        let vertex_buffer = device.create_vertex_buffer(self.max_vertices * std::mem::size_of::<LineVertex>())?;
        let vertex_array = device.create_vertex_array()?;
        if let Err(error) = device.add_vertex_buffer(vertex_array, vertex_buffer, &LineVertex::layout(), 0, 0) {
            device.destroy_vertex_array(vertex_array);
            device.destroy_buffer(vertex_buffer);
            return Err(error);
        }

        self.resources = Some(LineResources { shader, vertex_buffer, vertex_array });
        Ok(())
    }

    /// Queue a line segment
    ///
    /// Segments past capacity are dropped with a single warning per scene.
    pub fn push_line(&mut self, p0: Vec3, p1: Vec3, color: Vec4, entity_id: i32) {
        if self.vertices.len() + 2 > self.max_vertices {
            if !self.overflow_reported {
                log::warn!("Line batch full ({} vertices), dropping further lines this scene", self.max_vertices);
                self.overflow_reported = true;
            }
            return;
        }

        let color: [f32; 4] = color.into();
        for position in [p0, p1] {
            self.vertices.push(LineVertex { position: position.into(), color, entity_id });
        }
    }

    /// Queue the twelve edges of an axis-aligned box
    pub fn push_box(&mut self, center: Vec3, size: Vec3, color: Vec4, entity_id: i32) {
        let half = size * 0.5;
        let corners = UNIT_BOX_CORNERS.map(|[x, y, z]| {
            center + Vec3::new(x.signum() * half.x, y.signum() * half.y, z.signum() * half.z)
        });
        self.push_box_edges(&corners, color, entity_id);
    }

    /// Queue the twelve edges of the unit cube under `transform`
    pub fn push_box_transform(&mut self, transform: &Mat4, color: Vec4, entity_id: i32) {
        let corners = UNIT_BOX_CORNERS.map(|[x, y, z]| transform.transform_point(&Point3::new(x, y, z)).coords);
        self.push_box_edges(&corners, color, entity_id);
    }

    fn push_box_edges(&mut self, corners: &[Vec3; 8], color: Vec4, entity_id: i32) {
        for (a, b) in BOX_EDGES {
            self.push_line(corners[a], corners[b], color, entity_id);
        }
    }

    /// Upload and draw every queued line, then empty the batch
    ///
    /// Returns the number of vertices drawn; nothing is issued when the
    /// batch is empty.
    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<u32> {
        if self.vertices.is_empty() {
            return Ok(0);
        }
        let Some(state) = self.resources else {
            self.reset();
            return Err(crate::render::RenderError::NotInitialized("line batch".to_string()));
        };

        let count = self.vertices.len() as u32;
        let uploaded = device.set_vertex_buffer_data(state.vertex_buffer, bytemuck::cast_slice(&self.vertices));
        self.reset();
        uploaded?;

        device.bind_shader(state.shader);
        device.set_line_width(self.line_width);
        device.draw_lines(state.vertex_array, count);
        log::trace!("Flushed {} line vertices", count);
        Ok(count)
    }

    /// Drop every queued line
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.overflow_reported = false;
    }

    /// Release the vertex array and its buffer
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(state) = self.resources.take() {
            device.destroy_vertex_array(state.vertex_array);
            device.destroy_buffer(state.vertex_buffer);
        }
        self.reset();
    }

    /// Queued endpoints
    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    /// Number of queued endpoints
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Endpoint capacity
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Width passed to the device on flush
    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    /// Set the width used by the next flush
    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }
}
