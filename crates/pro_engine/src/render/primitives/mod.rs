//! Core primitive types for rendering
//!
//! Meshes and vertices, the view frustum, and the cameras that own one.

pub mod camera;
pub mod camera_controller;
pub mod frustum;
pub mod mesh;

// Re-export commonly used types
pub use camera::Camera3D;
pub use camera_controller::{Camera3DController, CameraKey, ControlMode};
pub use frustum::{Frustum, FrustumPlane, Plane};
pub use mesh::{Mesh, Vertex};
