//! # ProEngine
//!
//! A forward 3D render core: camera frustum math, per-entity visibility
//! culling, instance batching and frame orchestration behind an opaque
//! graphics device.
//!
//! ## Features
//!
//! - **Frustum Culling**: Bounding spheres cached per entity, tested against the camera frustum
//! - **Instancing**: Repeated meshes packed into one draw call, explicitly or automatically
//! - **Debug Lines**: Lines and boxes batched into a single draw at the end of a frame
//! - **Headless Device**: Records every device call, so frames run without a GPU
//!
//! ## Quick Start
//!
//! ```rust
//! use pro_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::default().with_invariant_policy(InvariantPolicy::Log);
//!     let mut renderer = FrameRenderer::new(Box::new(HeadlessDevice::new()), config)?;
//!     let controller = Camera3DController::new(16.0 / 9.0, ControlMode::Fly);
//!
//!     renderer.begin_scene(controller.camera());
//!     renderer.draw_sphere_at(Vec3::zeros(), 1.0, Vec4::new(0.2, 0.4, 1.0, 1.0), 0);
//!     renderer.end_scene();
//!
//!     println!("{} draw calls", renderer.stats().draw_calls);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::{ApplicationConfig, CameraConfig, InvariantPolicy, LightingConfig, RendererConfig},
        foundation::math::{Mat4, Vec3, Vec4},
        render::{
            Camera3D, Camera3DController, CameraKey, ControlMode, FrameRenderer, FrameStatistics,
            GraphicsDevice, HeadlessDevice, Material, MaterialHandle, Mesh, MeshHandle, Model,
            RenderError, RenderResult,
        },
        scene::{ModelRendererComponent, TransformComponent},
    };
}
