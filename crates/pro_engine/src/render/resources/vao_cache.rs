//! Per-mesh instanced vertex array cache
//!
//! Each distinct mesh drawn through the instancing path gets one vertex array
//! binding its static vertex stream and the shared instance stream. The cache
//! grows with the number of distinct meshes ever instanced and only shrinks
//! when a mesh is removed ([`RenderResourceCache::remove`]) or through
//! [`RenderResourceCache::clear_cache`].

use std::collections::HashMap;

use crate::render::api::{BufferHandle, BufferLayout, GraphicsDevice, VertexArrayHandle};
use crate::render::primitives::mesh::{Vertex, MESH_ATTRIBUTE_COUNT};
use crate::render::resources::arena::{GpuMesh, MeshHandle};
use crate::render::RenderResult;

/// Identity-keyed map from mesh handle to instanced vertex array
#[derive(Debug, Default)]
pub struct RenderResourceCache {
    vertex_arrays: HashMap<MeshHandle, VertexArrayHandle>,
}

impl RenderResourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached vertex array for `mesh`, building it on first use
    ///
    /// A new vertex array binds the mesh's vertex buffer at locations 0-3
    /// (per vertex), `instance_buffer` from location 4 with divisor 1, and
    /// the mesh's index buffer. Nothing is cached if any step fails.
    pub fn get_or_create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mesh: MeshHandle,
        gpu_mesh: &GpuMesh,
        instance_buffer: BufferHandle,
        instance_layout: &BufferLayout,
    ) -> RenderResult<VertexArrayHandle> {
        if let Some(&vertex_array) = self.vertex_arrays.get(&mesh) {
            return Ok(vertex_array);
        }

        let vertex_array = device.create_vertex_array()?;
        let bound = device
            .add_vertex_buffer(vertex_array, gpu_mesh.vertex_buffer, &Vertex::layout(), 0, 0)
            .and_then(|_| {
                device.add_vertex_buffer(vertex_array, instance_buffer, instance_layout, MESH_ATTRIBUTE_COUNT, 1)
            })
            .and_then(|_| device.set_index_buffer(vertex_array, gpu_mesh.index_buffer));

        if let Err(error) = bound {
            device.destroy_vertex_array(vertex_array);
            return Err(error);
        }

        self.vertex_arrays.insert(mesh, vertex_array);
        log::debug!("Created instanced vertex array for {:?}. Total cached: {}", mesh, self.vertex_arrays.len());
        Ok(vertex_array)
    }

    /// Destroy the vertex array cached for `mesh`
    ///
    /// Returns false if nothing was cached for it.
    pub fn remove(&mut self, device: &mut dyn GraphicsDevice, mesh: MeshHandle) -> bool {
        match self.vertex_arrays.remove(&mesh) {
            Some(vertex_array) => {
                device.destroy_vertex_array(vertex_array);
                log::debug!("Evicted instanced vertex array for {:?}", mesh);
                true
            }
            None => false,
        }
    }

    /// Destroy every cached vertex array
    pub fn clear_cache(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, vertex_array) in self.vertex_arrays.drain() {
            device.destroy_vertex_array(vertex_array);
        }
        log::debug!("Instanced vertex array cache cleared");
    }

    /// Number of cached vertex arrays
    pub fn len(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.vertex_arrays.is_empty()
    }

    /// Whether `mesh` has a cached vertex array
    pub fn contains(&self, mesh: MeshHandle) -> bool {
        self.vertex_arrays.contains_key(&mesh)
    }
}
