//! Headless graphics device
//!
//! A [`GraphicsDevice`] that owns no GPU. Every call is validated against the
//! resources the device has handed out and appended to a command log, which
//! makes it the device of choice for tests and for running the renderer
//! without a window.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Vec4};
use crate::render::api::{
    BufferHandle, BufferLayout, GraphicsDevice, PolygonMode, ShaderHandle, TextureHandle,
    UniformBufferHandle, VertexArrayHandle,
};
use crate::render::{RenderError, RenderResult};

bitflags! {
    /// Operations the headless device should refuse
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFailures: u8 {
        /// `create_shader` fails
        const SHADER_CREATION = 0x01;
        /// Every buffer allocation fails
        const BUFFER_CREATION = 0x02;
        /// `create_vertex_array` fails
        const VERTEX_ARRAY_CREATION = 0x04;
        /// `create_white_texture` fails
        const TEXTURE_CREATION = 0x08;
        /// `create_index_buffer` fails while vertex buffers still succeed
        const INDEX_BUFFER_CREATION = 0x10;
    }
}

impl Default for DeviceFailures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Kind of buffer behind a [`BufferHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex or instance data
    Vertex,
    /// `u32` indices
    Index,
}

/// Recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Shader program created
    CreateShader {
        /// Program name
        name: String,
        /// Issued handle
        shader: ShaderHandle,
    },
    /// Buffer allocated
    CreateBuffer {
        /// Issued handle
        buffer: BufferHandle,
        /// Buffer kind
        kind: BufferKind,
        /// Capacity in bytes
        size: usize,
    },
    /// Uniform buffer allocated
    CreateUniformBuffer {
        /// Issued handle
        buffer: UniformBufferHandle,
        /// Capacity in bytes
        size: usize,
        /// Binding point
        binding: u32,
    },
    /// Vertex buffer upload
    UploadVertexData {
        /// Target buffer
        buffer: BufferHandle,
        /// Uploaded bytes
        bytes: usize,
    },
    /// Uniform buffer upload
    UploadUniformData {
        /// Target buffer
        buffer: UniformBufferHandle,
        /// Uploaded bytes
        bytes: usize,
    },
    /// Vertex array created
    CreateVertexArray(VertexArrayHandle),
    /// Vertex buffer attached to a vertex array
    AddVertexBuffer {
        /// Target vertex array
        vertex_array: VertexArrayHandle,
        /// Attached buffer
        buffer: BufferHandle,
        /// First attribute location
        first_attribute: u32,
        /// Number of attribute locations used
        attribute_slots: u32,
        /// Attribute divisor
        divisor: u32,
    },
    /// Index buffer attached to a vertex array
    SetIndexBuffer {
        /// Target vertex array
        vertex_array: VertexArrayHandle,
        /// Attached buffer
        buffer: BufferHandle,
    },
    /// Vertex array released
    DestroyVertexArray(VertexArrayHandle),
    /// Buffer released
    DestroyBuffer(BufferHandle),
    /// Shader bound
    BindShader(ShaderHandle),
    /// Texture bound to a slot
    BindTexture {
        /// Bound texture
        texture: TextureHandle,
        /// Sampler slot
        slot: u32,
    },
    /// Uniform value set
    SetUniform {
        /// Target shader
        shader: ShaderHandle,
        /// Uniform name
        name: String,
    },
    /// Polygon mode switched
    SetPolygonMode(PolygonMode),
    /// Line width set
    SetLineWidth(f32),
    /// Indexed draw
    DrawIndexed {
        /// Drawn vertex array
        vertex_array: VertexArrayHandle,
        /// Index count
        index_count: u32,
    },
    /// Instanced indexed draw
    DrawInstanced {
        /// Drawn vertex array
        vertex_array: VertexArrayHandle,
        /// Index count per instance
        index_count: u32,
        /// Instance count
        instance_count: u32,
    },
    /// Line list draw
    DrawLines {
        /// Drawn vertex array
        vertex_array: VertexArrayHandle,
        /// Vertex count
        vertex_count: u32,
    },
    /// White texture created
    CreateTexture(TextureHandle),
}

#[derive(Debug, Clone, Copy)]
struct BufferInfo {
    kind: BufferKind,
    size: usize,
}

#[derive(Debug, Clone, Default)]
struct VertexArrayInfo {
    vertex_buffers: Vec<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    // Attribute locations already claimed by attached buffers
    used_attributes: Vec<u32>,
}

/// Command-recording device without a GPU
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u64,
    failures: DeviceFailures,
    commands: Vec<DeviceCommand>,
    // Log length that triggers dropping the older half; unbounded when None
    command_limit: Option<usize>,
    dropped_commands: usize,
    buffers: HashMap<BufferHandle, BufferInfo>,
    uniform_buffers: HashMap<UniformBufferHandle, usize>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayInfo>,
    shaders: Vec<ShaderHandle>,
    uploaded_bytes: usize,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device that refuses the given operations
    pub fn with_failures(failures: DeviceFailures) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Bound the command log to `limit` entries
    ///
    /// When the log is full the older half is discarded, so memory stays flat
    /// over a long frame loop while the newest calls remain inspectable.
    pub fn with_command_limit(mut self, limit: usize) -> Self {
        self.command_limit = Some(limit.max(1));
        self
    }

    /// Change which operations fail from now on
    pub fn set_failures(&mut self, failures: DeviceFailures) {
        self.failures = failures;
    }

    /// Every recorded call, oldest first
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forget recorded calls; resources stay alive
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Commands discarded because the log hit its limit
    pub fn dropped_commands(&self) -> usize {
        self.dropped_commands
    }

    /// Total bytes uploaded to vertex and uniform buffers
    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes
    }

    /// Capacity of a buffer, if it exists
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|info| info.size)
    }

    /// Number of live vertex and index buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live vertex arrays
    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Whether a vertex array is still alive
    pub fn has_vertex_array(&self, vertex_array: VertexArrayHandle) -> bool {
        self.vertex_arrays.contains_key(&vertex_array)
    }

    /// Vertex buffers attached to a vertex array, in attachment order
    pub fn vertex_buffers_of(&self, vertex_array: VertexArrayHandle) -> Option<&[BufferHandle]> {
        self.vertex_arrays.get(&vertex_array).map(|info| info.vertex_buffers.as_slice())
    }

    /// Index buffer attached to a vertex array
    pub fn index_buffer_of(&self, vertex_array: VertexArrayHandle) -> Option<BufferHandle> {
        self.vertex_arrays.get(&vertex_array).and_then(|info| info.index_buffer)
    }

    /// Number of shader programs created
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Number of draw commands of any kind
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    DeviceCommand::DrawIndexed { .. }
                        | DeviceCommand::DrawInstanced { .. }
                        | DeviceCommand::DrawLines { .. }
                )
            })
            .count()
    }

    fn record(&mut self, command: DeviceCommand) {
        if let Some(limit) = self.command_limit {
            if self.commands.len() >= limit {
                let excess = self.commands.len() - limit / 2;
                self.commands.drain(..excess);
                self.dropped_commands += excess;
            }
        }
        self.commands.push(command);
    }

    fn next_handle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn allocate_buffer(&mut self, kind: BufferKind, size: usize) -> RenderResult<BufferHandle> {
        if self.failures.contains(DeviceFailures::BUFFER_CREATION) {
            return Err(RenderError::ResourceCreationFailed(format!("{:?} buffer of {} bytes", kind, size)));
        }
        let buffer = BufferHandle(self.next_handle());
        self.buffers.insert(buffer, BufferInfo { kind, size });
        self.record(DeviceCommand::CreateBuffer { buffer, kind, size });
        Ok(buffer)
    }

    fn vertex_array_mut(&mut self, vertex_array: VertexArrayHandle) -> RenderResult<&mut VertexArrayInfo> {
        self.vertex_arrays
            .get_mut(&vertex_array)
            .ok_or_else(|| RenderError::BackendError(format!("unknown vertex array {:?}", vertex_array)))
    }

    fn buffer_of_kind(&self, buffer: BufferHandle, kind: BufferKind) -> RenderResult<BufferInfo> {
        match self.buffers.get(&buffer) {
            Some(info) if info.kind == kind => Ok(*info),
            Some(info) => Err(RenderError::BackendError(format!(
                "buffer {:?} is a {:?} buffer, expected {:?}",
                buffer, info.kind, kind
            ))),
            None => Err(RenderError::BackendError(format!("unknown buffer {:?}", buffer))),
        }
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_shader(&mut self, name: &str, vertex_source: &str, fragment_source: &str) -> RenderResult<ShaderHandle> {
        if self.failures.contains(DeviceFailures::SHADER_CREATION) {
            return Err(RenderError::ShaderCreationFailed(name.to_string()));
        }
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            return Err(RenderError::ShaderCreationFailed(format!("{}: empty shader stage", name)));
        }
        let shader = ShaderHandle(self.next_handle());
        self.shaders.push(shader);
        self.record(DeviceCommand::CreateShader { name: name.to_string(), shader });
        Ok(shader)
    }

    fn create_vertex_buffer(&mut self, size: usize) -> RenderResult<BufferHandle> {
        self.allocate_buffer(BufferKind::Vertex, size)
    }

    fn create_vertex_buffer_with_data(&mut self, data: &[u8]) -> RenderResult<BufferHandle> {
        let buffer = self.allocate_buffer(BufferKind::Vertex, data.len())?;
        self.uploaded_bytes += data.len();
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> RenderResult<BufferHandle> {
        if self.failures.contains(DeviceFailures::INDEX_BUFFER_CREATION) {
            return Err(RenderError::ResourceCreationFailed(format!("index buffer of {} indices", indices.len())));
        }
        self.allocate_buffer(BufferKind::Index, std::mem::size_of_val(indices))
    }

    fn create_uniform_buffer(&mut self, size: usize, binding: u32) -> RenderResult<UniformBufferHandle> {
        if self.failures.contains(DeviceFailures::BUFFER_CREATION) {
            return Err(RenderError::ResourceCreationFailed(format!("uniform buffer at binding {}", binding)));
        }
        let buffer = UniformBufferHandle(self.next_handle());
        self.uniform_buffers.insert(buffer, size);
        self.record(DeviceCommand::CreateUniformBuffer { buffer, size, binding });
        Ok(buffer)
    }

    fn set_vertex_buffer_data(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
        let info = self.buffer_of_kind(buffer, BufferKind::Vertex)?;
        if data.len() > info.size {
            return Err(RenderError::BackendError(format!(
                "upload of {} bytes overflows buffer {:?} of {} bytes",
                data.len(), buffer, info.size
            )));
        }
        self.uploaded_bytes += data.len();
        self.record(DeviceCommand::UploadVertexData { buffer, bytes: data.len() });
        Ok(())
    }

    fn set_uniform_buffer_data(&mut self, buffer: UniformBufferHandle, data: &[u8]) -> RenderResult<()> {
        let size = *self
            .uniform_buffers
            .get(&buffer)
            .ok_or_else(|| RenderError::BackendError(format!("unknown uniform buffer {:?}", buffer)))?;
        if data.len() > size {
            return Err(RenderError::BackendError(format!(
                "upload of {} bytes overflows uniform buffer of {} bytes",
                data.len(), size
            )));
        }
        self.uploaded_bytes += data.len();
        self.record(DeviceCommand::UploadUniformData { buffer, bytes: data.len() });
        Ok(())
    }

    fn create_vertex_array(&mut self) -> RenderResult<VertexArrayHandle> {
        if self.failures.contains(DeviceFailures::VERTEX_ARRAY_CREATION) {
            return Err(RenderError::ResourceCreationFailed("vertex array".to_string()));
        }
        let vertex_array = VertexArrayHandle(self.next_handle());
        self.vertex_arrays.insert(vertex_array, VertexArrayInfo::default());
        self.record(DeviceCommand::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn add_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
        layout: &BufferLayout,
        first_attribute: u32,
        divisor: u32,
    ) -> RenderResult<()> {
        self.buffer_of_kind(buffer, BufferKind::Vertex)?;
        let attribute_slots = layout.attribute_slots();
        let info = self.vertex_array_mut(vertex_array)?;

        let requested = first_attribute..first_attribute + attribute_slots;
        if let Some(clash) = requested.clone().find(|slot| info.used_attributes.contains(slot)) {
            return Err(RenderError::BackendError(format!(
                "attribute location {} already bound on {:?}",
                clash, vertex_array
            )));
        }
        info.used_attributes.extend(requested);
        info.vertex_buffers.push(buffer);

        self.record(DeviceCommand::AddVertexBuffer {
            vertex_array,
            buffer,
            first_attribute,
            attribute_slots,
            divisor,
        });
        Ok(())
    }

    fn set_index_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) -> RenderResult<()> {
        self.buffer_of_kind(buffer, BufferKind::Index)?;
        self.vertex_array_mut(vertex_array)?.index_buffer = Some(buffer);
        self.record(DeviceCommand::SetIndexBuffer { vertex_array, buffer });
        Ok(())
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array).is_some() {
            self.record(DeviceCommand::DestroyVertexArray(vertex_array));
        } else {
            log::warn!("Destroying unknown vertex array {:?}", vertex_array);
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("Destroying unknown buffer {:?}", buffer);
            return;
        }
        for info in self.vertex_arrays.values_mut() {
            info.vertex_buffers.retain(|&attached| attached != buffer);
            if info.index_buffer == Some(buffer) {
                info.index_buffer = None;
            }
        }
        self.record(DeviceCommand::DestroyBuffer(buffer));
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        self.record(DeviceCommand::BindShader(shader));
    }

    fn bind_texture(&mut self, texture: TextureHandle, slot: u32) {
        self.record(DeviceCommand::BindTexture { texture, slot });
    }

    fn set_uniform_int(&mut self, shader: ShaderHandle, name: &str, _value: i32) {
        self.record(DeviceCommand::SetUniform { shader, name: name.to_string() });
    }

    fn set_uniform_float(&mut self, shader: ShaderHandle, name: &str, _value: f32) {
        self.record(DeviceCommand::SetUniform { shader, name: name.to_string() });
    }

    fn set_uniform_float4(&mut self, shader: ShaderHandle, name: &str, _value: Vec4) {
        self.record(DeviceCommand::SetUniform { shader, name: name.to_string() });
    }

    fn set_uniform_mat4(&mut self, shader: ShaderHandle, name: &str, _value: &Mat4) {
        self.record(DeviceCommand::SetUniform { shader, name: name.to_string() });
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.record(DeviceCommand::SetPolygonMode(mode));
    }

    fn set_line_width(&mut self, width: f32) {
        self.record(DeviceCommand::SetLineWidth(width));
    }

    fn draw_indexed(&mut self, vertex_array: VertexArrayHandle, index_count: u32) {
        self.record(DeviceCommand::DrawIndexed { vertex_array, index_count });
    }

    fn draw_instanced(&mut self, vertex_array: VertexArrayHandle, index_count: u32, instance_count: u32) {
        self.record(DeviceCommand::DrawInstanced { vertex_array, index_count, instance_count });
    }

    fn draw_lines(&mut self, vertex_array: VertexArrayHandle, vertex_count: u32) {
        self.record(DeviceCommand::DrawLines { vertex_array, vertex_count });
    }

    fn create_white_texture(&mut self) -> RenderResult<TextureHandle> {
        if self.failures.contains(DeviceFailures::TEXTURE_CREATION) {
            return Err(RenderError::ResourceCreationFailed("white texture".to_string()));
        }
        let texture = TextureHandle(self.next_handle());
        self.record(DeviceCommand::CreateTexture(texture));
        Ok(texture)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
