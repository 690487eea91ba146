//! Math utilities and types
//!
//! Provides the fundamental math types used by the camera, culling and
//! batching code. Everything is `f32` and column-vector (`M * v`), matching
//! the layout the shaders consume.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Mat4Ext, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Build a world transform from position, scale and Euler rotation in degrees.
    ///
    /// Rotation is applied Z, then Y, then X in matrix order
    /// (`T * Rz * Ry * Rx * S`), which is the convention draw helpers such as
    /// `draw_mesh_trs` expose.
    pub fn transform_from_trs_degrees(position: Vec3, scale: Vec3, rotation_degrees: Vec3) -> Mat4 {
        Mat4::new_translation(&position)
            * Mat4::rotation_z(deg_to_rad(rotation_degrees.z))
            * Mat4::rotation_y(deg_to_rad(rotation_degrees.y))
            * Mat4::rotation_x(deg_to_rad(rotation_degrees.x))
            * Mat4::new_nonuniform_scaling(&scale)
    }

    /// Build a world transform from position and non-uniform scale only
    pub fn transform_from_translation_scale(position: Vec3, scale: Vec3) -> Mat4 {
        Mat4::new_translation(&position) * Mat4::new_nonuniform_scaling(&scale)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Right-handed perspective projection with clip-space depth in [-1, 1]
    fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation column of an affine transform
    fn translation_part(&self) -> Vec3;

    /// Lengths of the three basis columns (decomposed scale)
    fn axis_scales(&self) -> Vec3;

    /// Largest of the three basis-column lengths
    fn max_axis_scale(&self) -> f32;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [f/a  0   0             0          ]
        //     [0    f   0             0          ]
        //     [0    0   (f+n)/(n-f)   2fn/(n-f)  ]
        //     [0    0   -1            0          ]
        let focal = 1.0 / (fov_y * 0.5).tan();
        let depth = near - far;

        let mut result = Mat4::zeros();
        result[(0, 0)] = focal / aspect;
        result[(1, 1)] = focal;
        result[(2, 2)] = (far + near) / depth;
        result[(2, 3)] = (2.0 * far * near) / depth;
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            -forward.x, -forward.y, -forward.z, forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn axis_scales(&self) -> Vec3 {
        let column_length = |c: usize| Vec3::new(self[(0, c)], self[(1, c)], self[(2, c)]).norm();
        Vec3::new(column_length(0), column_length(1), column_length(2))
    }

    fn max_axis_scale(&self) -> f32 {
        let scales = self.axis_scales();
        scales.x.max(scales.y).max(scales.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_scales_of_scaled_rotation() {
        let m = utils::transform_from_trs_degrees(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(2.0, 3.0, 4.0),
            Vec3::new(30.0, 45.0, 60.0),
        );

        assert_relative_eq!(m.axis_scales(), Vec3::new(2.0, 3.0, 4.0), epsilon = 1e-5);
        assert_relative_eq!(m.max_axis_scale(), 4.0, epsilon = 1e-5);
        assert_relative_eq!(m.translation_part(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_look_at_maps_eye_to_origin_and_target_to_negative_z() {
        let eye = Vec3::new(0.0, 2.0, 5.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());

        let eye_view = view.transform_point(&Point3::from(eye));
        assert_relative_eq!(eye_view.coords, Vec3::zeros(), epsilon = 1e-5);

        let target_view = view.transform_point(&Point3::origin());
        assert!(target_view.z < 0.0);
        assert_relative_eq!(target_view.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective_rh(utils::deg_to_rad(60.0), 1.5, 0.5, 50.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -50.0, 1.0);

        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }
}
