//! Render-facing entity components

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::resources::{MaterialHandle, Model};

/// Position, Euler rotation and scale of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    /// World position
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z in local space
    pub rotation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
}

impl TransformComponent {
    /// Transform at `position` with no rotation and unit scale
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Set the rotation in radians
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// `T * Rx * Ry * Rz * S`
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * Mat4::rotation_x(self.rotation.x)
            * Mat4::rotation_y(self.rotation.y)
            * Mat4::rotation_z(self.rotation.z)
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Model to draw for an entity, with an optional material override
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRendererComponent {
    /// Meshes to draw; nothing is drawn when absent
    pub model: Option<Model>,
    /// Material used for every mesh instead of the mesh's own
    pub override_material: Option<MaterialHandle>,
}

impl ModelRendererComponent {
    /// Component drawing `model` with its own materials
    pub fn new(model: Model) -> Self {
        Self {
            model: Some(model),
            override_material: None,
        }
    }
}
