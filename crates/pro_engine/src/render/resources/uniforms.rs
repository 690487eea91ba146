//! Uniform buffer data shared by every shader
//!
//! Both blocks use std140 layout. A `vec3` followed by a `float` packs into
//! one 16-byte row, so neither struct needs padding beyond the trailing
//! float of [`CameraUniform`].

use bytemuck::{Pod, Zeroable};

use crate::core::config::LightingConfig;
use crate::foundation::math::{Mat4, Vec3};

/// Binding point of the camera block
pub const CAMERA_BINDING: u32 = 0;

/// Binding point of the light block
pub const LIGHT_BINDING: u32 = 1;

/// `layout(std140, binding = 0) uniform Camera`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// `projection * view`, column-major
    pub view_projection: [[f32; 4]; 4],
    /// World-space camera position
    pub camera_position: [f32; 3],
    /// std140 padding
    pub _padding: f32,
}

impl CameraUniform {
    /// Pack camera data
    pub fn new(view_projection: &Mat4, camera_position: Vec3) -> Self {
        Self {
            view_projection: (*view_projection).into(),
            camera_position: camera_position.into(),
            _padding: 0.0,
        }
    }
}

/// `layout(std140, binding = 1) uniform Light`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// World-space point light position
    pub point_light_position: [f32; 3],
    /// Point light intensity
    pub point_light_intensity: f32,
    /// Ambient color
    pub ambient_color: [f32; 3],
    /// Ambient intensity
    pub ambient_intensity: f32,
}

impl From<&LightingConfig> for LightUniform {
    fn from(lighting: &LightingConfig) -> Self {
        Self {
            point_light_position: lighting.point_light_position.into(),
            point_light_intensity: lighting.point_light_intensity,
            ambient_color: lighting.ambient_color.into(),
            ambient_intensity: lighting.ambient_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std140_sizes() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn test_matrix_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let uniform = CameraUniform::new(&m, Vec3::zeros());
        assert_eq!(uniform.view_projection[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_light_from_config() {
        let uniform = LightUniform::from(&LightingConfig::default());
        assert_eq!(uniform.point_light_position, [1.0, 1.0, 0.0]);
        assert_eq!(uniform.point_light_intensity, 1.0);
        assert_eq!(uniform.ambient_intensity, 0.0);
    }
}
