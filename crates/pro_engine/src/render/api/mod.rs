//! Public rendering API
//!
//! The device boundary the render core is written against, and the vertex
//! layout description shared by every backend.

pub mod buffer_layout;
pub mod device;

// Re-export commonly used types
pub use buffer_layout::{BufferElement, BufferLayout, ShaderDataType};
pub use device::{
    GraphicsDevice, PolygonMode, ShaderHandle, BufferHandle, VertexArrayHandle,
    UniformBufferHandle, TextureHandle,
};
