//! Graphics device abstraction
//!
//! The renderer only ever talks to the GPU through [`GraphicsDevice`]. Shader
//! compilation, buffer uploads, vertex array setup and draw submission are an
//! opaque capability set; the concrete backend is chosen once at startup and
//! handed to the renderer as a trait object.

use crate::foundation::math::{Mat4, Vec4};
use crate::render::RenderResult;
use super::buffer_layout::BufferLayout;

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u64);

/// Handle to a vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a vertex array (attribute binding configuration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u64);

/// Handle to a uniform buffer bound at a fixed binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformBufferHandle(pub u64);

/// Handle to a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Rasterizer fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Filled triangles
    Fill,
    /// Triangle edges only
    Line,
}

/// Capability set the render core needs from a graphics API
///
/// Methods that allocate return a handle or an error; state setters are
/// infallible. Handles are only meaningful to the device that issued them.
pub trait GraphicsDevice {
    /// Compile and link a shader program from vertex and fragment sources
    fn create_shader(&mut self, name: &str, vertex_source: &str, fragment_source: &str) -> RenderResult<ShaderHandle>;

    /// Allocate a dynamic vertex buffer of `size` bytes
    fn create_vertex_buffer(&mut self, size: usize) -> RenderResult<BufferHandle>;

    /// Allocate a static vertex buffer initialized with `data`
    fn create_vertex_buffer_with_data(&mut self, data: &[u8]) -> RenderResult<BufferHandle>;

    /// Allocate an index buffer
    fn create_index_buffer(&mut self, indices: &[u32]) -> RenderResult<BufferHandle>;

    /// Allocate a uniform buffer of `size` bytes bound at `binding`
    fn create_uniform_buffer(&mut self, size: usize, binding: u32) -> RenderResult<UniformBufferHandle>;

    /// Upload `data` to the start of a vertex buffer
    fn set_vertex_buffer_data(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()>;

    /// Upload `data` to the start of a uniform buffer
    fn set_uniform_buffer_data(&mut self, buffer: UniformBufferHandle, data: &[u8]) -> RenderResult<()>;

    /// Create an empty vertex array
    fn create_vertex_array(&mut self) -> RenderResult<VertexArrayHandle>;

    /// Attach a vertex buffer to a vertex array
    ///
    /// # Arguments
    /// * `first_attribute` - Attribute location of the layout's first element
    /// * `divisor` - 0 for per-vertex data, 1 for per-instance data
    fn add_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
        layout: &BufferLayout,
        first_attribute: u32,
        divisor: u32,
    ) -> RenderResult<()>;

    /// Attach an index buffer to a vertex array
    fn set_index_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) -> RenderResult<()>;

    /// Release a vertex array; its buffers stay alive
    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Release a vertex or index buffer
    ///
    /// Vertex arrays still referencing the buffer must be destroyed first.
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Make a shader current
    fn bind_shader(&mut self, shader: ShaderHandle);

    /// Bind a texture to a sampler slot
    fn bind_texture(&mut self, texture: TextureHandle, slot: u32);

    /// Set an `int` uniform
    fn set_uniform_int(&mut self, shader: ShaderHandle, name: &str, value: i32);

    /// Set a `float` uniform
    fn set_uniform_float(&mut self, shader: ShaderHandle, name: &str, value: f32);

    /// Set a `vec4` uniform
    fn set_uniform_float4(&mut self, shader: ShaderHandle, name: &str, value: Vec4);

    /// Set a `mat4` uniform
    fn set_uniform_mat4(&mut self, shader: ShaderHandle, name: &str, value: &Mat4);

    /// Switch between filled and wireframe rasterization
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Line width for line primitives
    fn set_line_width(&mut self, width: f32);

    /// Draw `index_count` indices as triangles
    fn draw_indexed(&mut self, vertex_array: VertexArrayHandle, index_count: u32);

    /// Draw `index_count` indices as triangles, `instance_count` times
    fn draw_instanced(&mut self, vertex_array: VertexArrayHandle, index_count: u32, instance_count: u32);

    /// Draw `vertex_count` vertices as a line list
    fn draw_lines(&mut self, vertex_array: VertexArrayHandle, vertex_count: u32);

    /// Create a 1x1 opaque white texture
    fn create_white_texture(&mut self) -> RenderResult<TextureHandle>;

    /// Downcast to the concrete device type
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the mutable concrete device type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
