//! Core engine systems

pub mod config;

pub use config::{
    ApplicationConfig, CameraConfig, EngineConfig, InvariantPolicy, LightingConfig,
    RendererConfig,
};
