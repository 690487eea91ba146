//! # 3D Camera System
//!
//! Perspective camera whose view matrix and [`Frustum`] are kept in sync with
//! its state. Every setter recomputes both before returning, so a frustum read
//! right after a mutation always reflects that mutation.
//!
//! ## Conventions
//! - Right-handed, Y-up world space
//! - The camera looks down its `forward` vector, `-Z` by default
//! - Clip-space depth in `[-1, 1]`
//! - Field of view is stored in degrees and converted when the projection is built

use crate::foundation::math::{Vec3, Mat4, Mat4Ext, utils};
use super::frustum::Frustum;

/// 3D perspective camera with a cached view frustum
///
/// Holds position, orientation and projection parameters together with the
/// derived projection, view and frustum. The derived values are private and
/// only reachable through getters so that they can never go stale.
#[derive(Debug, Clone)]
pub struct Camera3D {
    position: Vec3,
    forward: Vec3,
    up: Vec3,

    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,

    projection: Mat4,
    view: Mat4,
    frustum: Frustum,
}

impl Camera3D {
    /// Create a perspective camera at the origin looking down `-Z`
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `near` - Near clip distance (must be > 0)
    /// * `far` - Far clip distance (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use pro_engine::render::Camera3D;
    /// use pro_engine::foundation::math::Vec3;
    ///
    /// let mut camera = Camera3D::new(60.0, 16.0 / 9.0, 0.1, 1000.0);
    /// camera.set_position(Vec3::new(0.0, 2.0, 5.0));
    /// camera.look_at(Vec3::zeros());
    /// assert!(camera.point_in_frustum(&Vec3::zeros()));
    /// ```
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::zeros(),
            forward: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_degrees,
            aspect,
            near,
            far,
            projection: Mat4::identity(),
            view: Mat4::identity(),
            frustum: Frustum::default(),
        };
        camera.recalculate_projection();
        camera.recalculate_view();
        camera
    }

    /// Replace all projection parameters at once
    pub fn set_perspective(&mut self, fov_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.fov_degrees = fov_degrees;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.recalculate_projection();
        log::trace!("Camera perspective: fov={} aspect={} near={} far={}", fov_degrees, aspect, near, far);
    }

    /// Change the vertical field of view (degrees)
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
        self.recalculate_projection();
    }

    /// Update the aspect ratio from a viewport size
    ///
    /// A zero height is ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height == 0 {
            log::debug!("Ignoring viewport resize to zero height ({}x{})", width, height);
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.recalculate_projection();
    }

    /// Move the camera without changing its orientation
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recalculate_view();
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera along a direction (normalized internally)
    ///
    /// Zero-length directions are ignored.
    pub fn set_forward_direction(&mut self, forward: Vec3) {
        match forward.try_normalize(f32::EPSILON) {
            Some(direction) => {
                self.forward = direction;
                self.recalculate_view();
            }
            None => log::debug!("Ignoring zero-length forward direction"),
        }
    }

    /// Turn the camera towards a world-space point
    pub fn look_at(&mut self, target: Vec3) {
        self.set_forward_direction(target - self.position);
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// View matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// `projection * view`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit forward direction
    pub fn forward_direction(&self) -> Vec3 {
        self.forward
    }

    /// Unit right direction
    pub fn right_direction(&self) -> Vec3 {
        self.forward.cross(&self.reference_up()).normalize()
    }

    /// Unit up direction, orthogonal to forward and right
    pub fn up_direction(&self) -> Vec3 {
        self.right_direction().cross(&self.forward)
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov_degrees
    }

    /// Aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Near clip distance
    pub fn near_clip(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far_clip(&self) -> f32 {
        self.far
    }

    /// Frustum matching the current view and projection
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Point visibility
    pub fn point_in_frustum(&self, point: &Vec3) -> bool {
        self.frustum.contains_point(point)
    }

    /// Sphere visibility
    pub fn sphere_in_frustum(&self, center: &Vec3, radius: f32) -> bool {
        self.frustum.intersects_sphere(center, radius)
    }

    /// Axis-aligned box visibility
    pub fn aabb_in_frustum(&self, min: &Vec3, max: &Vec3) -> bool {
        self.frustum.intersects_aabb(min, max)
    }

    fn recalculate_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            utils::deg_to_rad(self.fov_degrees),
            self.aspect,
            self.near,
            self.far,
        );
        self.recalculate_frustum();
    }

    // World up, swapped for +Z when looking straight up or down
    fn reference_up(&self) -> Vec3 {
        if self.forward.cross(&self.up).norm_squared() < 1e-8 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            self.up
        }
    }

    fn recalculate_view(&mut self) {
        self.view = Mat4::look_at(self.position, self.position + self.forward, self.reference_up());
        self.recalculate_frustum();
    }

    fn recalculate_frustum(&mut self) {
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }
}

impl Default for Camera3D {
    fn default() -> Self {
        Self::new(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}
