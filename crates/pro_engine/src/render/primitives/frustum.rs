//! # View Frustum
//!
//! Six clip planes extracted from a combined view-projection matrix, and the
//! point / sphere / box classification that culling is built on.
//!
//! ## Plane Extraction
//!
//! With `r0..r3` the rows of `M = projection * view`, the planes are taken
//! in the order Left, Right, Bottom, Top, Near, Far:
//!
//! ```text
//! Left   = r3 + r0      Right = r3 - r0
//! Bottom = r3 + r1      Top   = r3 - r1
//! Near   = r3 + r2      Far   = r3 - r2
//! ```
//!
//! This pairing assumes a clip-space depth range of `[-1, 1]`, which is what
//! [`Mat4Ext::perspective_rh`](crate::foundation::math::Mat4Ext::perspective_rh)
//! produces. Every plane normal points into the frustum, so a positive signed
//! distance means "inside".

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Normal lengths at or below this are left unnormalized
pub const PLANE_NORMALIZE_EPSILON: f32 = 1e-4;

/// Plane in 3D space, `normal . x + distance = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Plane normal, unit length after normalization
    pub normal: Vec3,
    /// Signed distance term
    pub distance: f32,
}

impl Plane {
    /// Create a plane from its raw coefficients
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Build a plane from a `(a, b, c, d)` row and normalize it.
    ///
    /// Degenerate rows (normal length `<= 1e-4`) are kept as they are.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let mut plane = Self::new(coefficients.xyz(), coefficients.w);
        plane.normalize();
        plane
    }

    /// Divide normal and distance by the normal length
    pub fn normalize(&mut self) {
        let length = self.normal.norm();
        if length > PLANE_NORMALIZE_EPSILON {
            self.normal /= length;
            self.distance /= length;
        }
    }

    /// Signed distance from the plane to a point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.0, 0.0), 0.0)
    }
}

/// Identifies one of the six frustum planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumPlane {
    /// Left clip plane
    Left = 0,
    /// Right clip plane
    Right = 1,
    /// Bottom clip plane
    Bottom = 2,
    /// Top clip plane
    Top = 3,
    /// Near clip plane
    Near = 4,
    /// Far clip plane
    Far = 5,
}

impl FrustumPlane {
    /// All planes in storage order
    pub const ALL: [FrustumPlane; 6] = [
        FrustumPlane::Left,
        FrustumPlane::Right,
        FrustumPlane::Bottom,
        FrustumPlane::Top,
        FrustumPlane::Near,
        FrustumPlane::Far,
    ];
}

/// View frustum for culling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract the six clip planes from a view-projection matrix
    ///
    /// # Arguments
    /// * `view_projection` - `projection * view`, column-vector convention
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Planes in the order Left, Right, Bottom, Top, Near, Far
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// A single plane
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// True when the point lies on or inside every plane
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// True unless the sphere lies entirely outside some plane
    ///
    /// Conservative: spheres near a frustum corner can report `true` while
    /// being outside the actual volume.
    pub fn intersects_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Positive-vertex test of an axis-aligned box against every plane
    pub fn intersects_aabb(&self, min: &Vec3, max: &Vec3) -> bool {
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let positive = Vec3::new(
                if plane.normal.x >= 0.0 { max.x } else { min.x },
                if plane.normal.y >= 0.0 { max.y } else { min.y },
                if plane.normal.z >= 0.0 { max.z } else { min.z },
            );

            if plane.distance_to_point(&positive) < 0.0 {
                return false;
            }
        }
        true
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_view_projection(&Mat4::identity())
    }
}
