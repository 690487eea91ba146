//! # Unified Configuration System
//!
//! Every tunable of the render core in one place: renderer limits and
//! toggles, default lighting, camera defaults and engine-level settings.
//!
//! ## Design Goals
//!
//! - **Centralized**: All configuration types in one place for easy discovery
//! - **Serializable**: Loadable from TOML or RON through [`Config`]
//! - **Type Safe**: Strong typing with validation and defaults
//!
//! Every struct is `#[serde(default)]`, so a file only has to name the
//! values it overrides.

use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

pub use crate::config::{Config, ConfigError};

/// Hard upper bound on instances per instanced submission
pub const DEFAULT_MAX_INSTANCES: usize = 100_000;

/// Capacity of the CPU-side debug line buffer, in vertices
pub const DEFAULT_MAX_LINE_VERTICES: usize = 100_000;

/// How broken internal invariants are reported
///
/// Covers a cull test with no bound frustum, a negative entity id, and draw
/// calls issued outside a `begin_scene`/`end_scene` bracket. Either way the
/// renderer treats the affected item as visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantPolicy {
    /// Log and then panic (debug builds)
    Panic,
    /// Log at error severity and carry on (release builds)
    Log,
}

impl InvariantPolicy {
    /// Policy matching the current build profile
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Log
        }
    }

    /// Report a violated invariant according to this policy
    pub fn report(self, message: &str) {
        log::error!("{}", message);
        if self == Self::Panic {
            panic!("{}", message);
        }
    }
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        Self::for_build()
    }
}

/// # Lighting Configuration
///
/// Initial contents of the light uniform buffer. The renderer copies these
/// into its state at construction; `set_point_light_position` and
/// `set_ambient_light` change them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// World-space position of the single point light
    pub point_light_position: Vec3,
    /// Point light intensity multiplier
    pub point_light_intensity: f32,
    /// Ambient light color
    pub ambient_color: Vec3,
    /// Ambient light intensity
    pub ambient_intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            point_light_position: Vec3::new(1.0, 1.0, 0.0),
            point_light_intensity: 1.0,
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.0,
        }
    }
}

/// # Renderer Configuration
///
/// Limits and toggles of the forward renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum instances packed into one instanced draw
    pub max_instances: usize,
    /// Maximum debug line vertices buffered per scene
    pub max_line_vertices: usize,
    /// Debug line width in pixels
    pub line_width: f32,
    /// Start in wireframe mode
    pub wireframe: bool,
    /// Queue flat-colored draws and instance repeated meshes at `end_scene`
    pub auto_instancing: bool,
    /// Minimum queued draws of one mesh before auto-instancing kicks in
    pub instancing_threshold: u32,
    /// Initial lighting
    pub lighting: LightingConfig,
    /// How invariant violations are reported
    pub invariant_policy: InvariantPolicy,
}

impl RendererConfig {
    /// Create a renderer configuration with defaults
    pub fn new() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            max_line_vertices: DEFAULT_MAX_LINE_VERTICES,
            line_width: 2.0,
            wireframe: false,
            auto_instancing: false,
            instancing_threshold: 8,
            lighting: LightingConfig::default(),
            invariant_policy: InvariantPolicy::for_build(),
        }
    }

    /// Set the instance cap
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances;
        self
    }

    /// Set the debug line vertex capacity
    pub fn with_max_line_vertices(mut self, max_line_vertices: usize) -> Self {
        self.max_line_vertices = max_line_vertices;
        self
    }

    /// Enable auto-instancing with the given threshold
    pub fn with_auto_instancing(mut self, threshold: u32) -> Self {
        self.auto_instancing = true;
        self.instancing_threshold = threshold;
        self
    }

    /// Set the invariant policy
    pub fn with_invariant_policy(mut self, policy: InvariantPolicy) -> Self {
        self.invariant_policy = policy;
        self
    }

    /// Set the initial lighting
    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_instances == 0 {
            return Err(ConfigError::Validation("max_instances must be at least 1".to_string()));
        }
        if self.max_instances > DEFAULT_MAX_INSTANCES {
            return Err(ConfigError::Validation(format!(
                "max_instances {} exceeds the supported maximum of {}",
                self.max_instances, DEFAULT_MAX_INSTANCES
            )));
        }
        if self.max_line_vertices < 2 || self.max_line_vertices % 2 != 0 {
            return Err(ConfigError::Validation(
                "max_line_vertices must be an even number of at least 2".to_string(),
            ));
        }
        if !(self.line_width > 0.0) {
            return Err(ConfigError::Validation("line_width must be positive".to_string()));
        }
        if self.instancing_threshold < 2 {
            return Err(ConfigError::Validation("instancing_threshold must be at least 2".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Camera Configuration
///
/// Start-up parameters of the default camera controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip distance
    pub near_clip: f32,
    /// Far clip distance
    pub far_clip: f32,
    /// Start position
    pub position: Vec3,
    /// Movement speed in units per second
    pub movement_speed: f32,
    /// Degrees of yaw/pitch per pixel of mouse motion
    pub mouse_sensitivity: f32,
    /// Scroll multiplier
    pub zoom_speed: f32,
}

impl CameraConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Validation(format!(
                "fov_degrees {} must lie in (0, 180)",
                self.fov_degrees
            )));
        }
        if !(self.near_clip > 0.0) || self.far_clip <= self.near_clip {
            return Err(ConfigError::Validation(format!(
                "clip range [{}, {}] must satisfy 0 < near < far",
                self.near_clip, self.far_clip
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near_clip: 0.1,
            far_clip: 1000.0,
            position: Vec3::new(0.0, 2.0, 5.0),
            movement_speed: 5.0,
            mouse_sensitivity: 0.1,
            zoom_speed: 1.0,
        }
    }
}

/// # Engine Configuration
///
/// Core engine behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Number of frames the sandbox runs before exiting
    pub frame_count: u32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            frame_count: 3,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
    /// Camera defaults
    pub camera: CameraConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ApplicationConfig::default().validate().is_ok());
        assert_eq!(RendererConfig::default().max_instances, 100_000);
    }

    #[test]
    fn test_invalid_renderer_values_rejected() {
        assert!(RendererConfig::new().with_max_instances(0).validate().is_err());
        assert!(RendererConfig::new().with_max_line_vertices(3).validate().is_err());
        assert!(RendererConfig::new().with_auto_instancing(1).validate().is_err());
    }

    #[test]
    fn test_invalid_camera_values_rejected() {
        let config = CameraConfig { near_clip: 10.0, far_clip: 5.0, ..CameraConfig::default() };
        assert!(config.validate().is_err());

        let config = CameraConfig { fov_degrees: 0.0, ..CameraConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = "[renderer]\nmax_instances = 64\nwireframe = true\n";
        let config: ApplicationConfig = toml::from_str(text).expect("parse");

        assert_eq!(config.renderer.max_instances, 64);
        assert!(config.renderer.wireframe);
        assert_eq!(config.renderer.max_line_vertices, DEFAULT_MAX_LINE_VERTICES);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_save_and_load_ron_file() {
        let path = std::env::temp_dir().join(format!("pro_engine_config_{}.ron", std::process::id()));
        let mut config = ApplicationConfig::default();
        config.renderer.instancing_threshold = 16;
        config.engine = EngineConfig::new().with_log_level("debug");

        config.save_to_file(&path).expect("save");
        let loaded = ApplicationConfig::load_from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let path = std::env::temp_dir().join("pro_engine_config.yaml");
        let result = ApplicationConfig::default().save_to_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    #[should_panic(expected = "broken")]
    fn test_panic_policy_panics() {
        InvariantPolicy::Panic.report("broken");
    }
}
