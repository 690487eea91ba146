//! Scene-side data the renderer consumes
//!
//! Only the components a draw site hands to the renderer live here; entity
//! storage and hierarchy are left to the application.

pub mod components;

pub use components::{ModelRendererComponent, TransformComponent};
