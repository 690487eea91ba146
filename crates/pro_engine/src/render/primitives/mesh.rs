//! Mesh representation for 3D models
//!
//! CPU-side geometry plus the two built-in primitives the renderer draws
//! without any asset: a cube and a UV sphere. Both are centered on the origin
//! and fit inside the unit cube at their default sizes, which is the
//! assumption the culling radius heuristic makes.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::constants::PI;
use crate::render::api::{BufferElement, BufferLayout, ShaderDataType};

/// Attribute locations `0..MESH_ATTRIBUTE_COUNT` belong to the mesh stream
pub const MESH_ATTRIBUTE_COUNT: u32 = 4;

/// 3D vertex: position, normal, tangent and texture coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Unit tangent, along increasing `u`
    pub tangent: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tangent: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, normal, tangent, tex_coord }
    }

    /// Attribute layout of the mesh stream (locations 0-3)
    pub fn layout() -> BufferLayout {
        BufferLayout::new(vec![
            BufferElement::new(ShaderDataType::Float3, "a_Position"),
            BufferElement::new(ShaderDataType::Float3, "a_Normal"),
            BufferElement::new(ShaderDataType::Float3, "a_Tangent"),
            BufferElement::new(ShaderDataType::Float2, "a_TexCoord"),
        ])
    }
}

/// Triangle mesh with `u32` indices
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Axis-aligned cube with edge length `size`, 24 vertices and 36 indices
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;

        // (normal, tangent) per face; the remaining axis is normal x tangent
        let faces: [([f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, tangent) in faces {
            let n = nalgebra::Vector3::from(normal);
            let t = nalgebra::Vector3::from(tangent);
            let b = n.cross(&t);
            let base = vertices.len() as u32;

            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = (n + t * (2.0 * u - 1.0) + b * (2.0 * v - 1.0)) * h;
                vertices.push(Vertex::new(p.into(), normal, tangent, [u, v]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// UV sphere
    ///
    /// # Arguments
    /// * `radius` - Sphere radius
    /// * `sectors` - Segments around the Y axis (at least 3)
    /// * `stacks` - Segments from pole to pole (at least 2)
    pub fn sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        for i in 0..=stacks {
            // From +Y down to -Y
            let stack_angle = PI * 0.5 - PI * i as f32 / stacks as f32;
            let (xz, y) = (stack_angle.cos(), stack_angle.sin());

            for j in 0..=sectors {
                let sector_angle = 2.0 * PI * j as f32 / sectors as f32;
                let normal = [xz * sector_angle.cos(), y, xz * sector_angle.sin()];
                let tangent = [-sector_angle.sin(), 0.0, sector_angle.cos()];
                let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
                let tex_coord = [j as f32 / sectors as f32, i as f32 / stacks as f32];
                vertices.push(Vertex::new(position, normal, tangent, tex_coord));
            }
        }

        let mut indices = Vec::new();
        for i in 0..stacks {
            let k1 = i * (sectors + 1);
            let k2 = k1 + sectors + 1;
            for j in 0..sectors {
                if i != 0 {
                    indices.extend_from_slice(&[k1 + j, k1 + j + 1, k2 + j]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[k1 + j + 1, k2 + j + 1, k2 + j]);
                }
            }
        }

        Self::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.stride() as usize, std::mem::size_of::<Vertex>());
        assert_eq!(layout.attribute_slots(), MESH_ATTRIBUTE_COUNT);
    }

    #[test]
    fn test_cube_counts_and_extent() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);

        for vertex in &cube.vertices {
            for c in vertex.position {
                assert_relative_eq!(c.abs(), 0.5, epsilon = 1e-6);
            }
        }
        assert!(cube.indices.iter().all(|&i| i < 24));
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let cube = Mesh::cube(2.0);
        for triangle in cube.indices.chunks(3) {
            let p = |i: u32| nalgebra::Vector3::from(cube.vertices[i as usize].position);
            let (a, b, c) = (p(triangle[0]), p(triangle[1]), p(triangle[2]));
            let face_normal = (b - a).cross(&(c - a));
            let normal = nalgebra::Vector3::from(cube.vertices[triangle[0] as usize].normal);
            assert!(face_normal.dot(&normal) > 0.0);
        }
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let sphere = Mesh::sphere(0.5, 16, 16);
        assert_eq!(sphere.vertex_count(), 17 * 17);
        // Two pole rings of single triangles plus full quads between
        assert_eq!(sphere.index_count(), 16 * 3 * 2 + 16 * 14 * 6);

        for vertex in &sphere.vertices {
            let length = nalgebra::Vector3::from(vertex.position).norm();
            assert_relative_eq!(length, 0.5, epsilon = 1e-5);
        }
        assert!(sphere.indices.iter().all(|&i| i < sphere.vertex_count()));
    }
}
