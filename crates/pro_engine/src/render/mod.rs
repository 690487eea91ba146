//! # Rendering System
//!
//! The render core of the engine: camera and frustum math, per-entity
//! visibility culling, instance batching and frame orchestration.
//!
//! ## Architecture
//!
//! - **FrameRenderer**: owned per-frame coordinator, the only type draw sites talk to
//! - **Camera3D**: perspective camera that keeps its view frustum current
//! - **VisibilityCuller**: bounding-sphere cache and fail-open frustum test
//! - **BatchAccumulator**: culls, caps and packs instances into one draw call
//! - **GraphicsDevice**: the opaque GPU boundary; [`HeadlessDevice`] records
//!   calls instead of issuing them
//!
//! ## Frame Lifecycle
//!
//! ```text
//! Idle --begin_scene--> SceneActive --end_scene--> Idle
//! ```
//!
//! Draws are only accepted while a scene is active. Lines and auto-instanced
//! draws are flushed by `end_scene`.

pub mod api;
pub mod backends;
pub mod primitives;
pub mod resources;
pub mod shaders;
pub mod systems;

mod renderer3d;

#[cfg(test)]
mod renderer3d_tests;

use thiserror::Error;

pub use api::{GraphicsDevice, PolygonMode, TextureHandle};
pub use backends::HeadlessDevice;
pub use primitives::{Camera3D, Camera3DController, CameraKey, ControlMode, Frustum, FrustumPlane, Mesh, Plane, Vertex};
pub use renderer3d::{FrameRenderer, SceneState};
pub use resources::{Material, MaterialHandle, MeshHandle, Model, RenderResources};
pub use systems::{FrameStatistics, InstanceRecord, InstancedStats, VisibilityCuller};

/// Errors reported by the render core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Renderer setup failed
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A subsystem was used before `init` succeeded
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Shader compilation or linking failed
    #[error("Shader creation failed: {0}")]
    ShaderCreationFailed(String),

    /// Parallel submission arrays differ in length or are empty
    #[error("Mismatched instance submission: {transforms} transforms, {colors} colors, {entity_ids} entity ids")]
    MismatchedSubmission {
        /// Transform count
        transforms: usize,
        /// Color count
        colors: usize,
        /// Entity id count
        entity_ids: usize,
    },

    /// Mesh handle does not resolve
    #[error("Unknown mesh handle")]
    UnknownMesh,

    /// Material handle does not resolve
    #[error("Unknown material handle")]
    UnknownMaterial,

    /// A device resource could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Call not valid in the current frame state
    #[error("Invalid renderer state: {0}")]
    InvalidState(String),

    /// Backend rejected a call
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
