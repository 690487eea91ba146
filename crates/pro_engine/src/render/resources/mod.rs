//! Resource management
//!
//! Handle-addressed mesh and material storage, the per-mesh instanced
//! vertex array cache, and the uniform blocks every shader reads.

pub mod arena;
pub mod uniforms;
pub mod vao_cache;

pub use arena::{GpuMesh, Material, MaterialHandle, MeshHandle, Model, RenderResources};
pub use uniforms::{CameraUniform, LightUniform, CAMERA_BINDING, LIGHT_BINDING};
pub use vao_cache::RenderResourceCache;
