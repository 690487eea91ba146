//! Render resource storage
//!
//! Meshes and materials live in slot maps and are referenced everywhere else
//! by [`MeshHandle`] / [`MaterialHandle`]. A handle to a removed resource
//! simply stops resolving; it never aliases a newer resource.

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec4;
use crate::render::api::{BufferHandle, GraphicsDevice, TextureHandle, VertexArrayHandle};
use crate::render::primitives::mesh::{Mesh, Vertex};
use crate::render::{RenderError, RenderResult};

new_key_type! {
    /// Stable handle to an uploaded mesh
    pub struct MeshHandle;

    /// Stable handle to a material
    pub struct MaterialHandle;
}

/// Surface description used by individual draws
///
/// Texture slots left empty are bound to the renderer's white texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color multiplier
    pub albedo_color: Vec4,
    /// Metalness in `[0, 1]`
    pub metallic: f32,
    /// Roughness in `[0, 1]`
    pub roughness: f32,
    /// Albedo texture (slot 0)
    pub albedo_map: Option<TextureHandle>,
    /// Normal map (slot 1)
    pub normal_map: Option<TextureHandle>,
    /// Metallic map (slot 2)
    pub metallic_map: Option<TextureHandle>,
    /// Roughness map (slot 3)
    pub roughness_map: Option<TextureHandle>,
}

impl Material {
    /// Untextured material of a single color
    pub fn from_color(albedo_color: Vec4) -> Self {
        Self {
            albedo_color,
            ..Self::default()
        }
    }

    /// Set metallic and roughness
    pub fn with_pbr(mut self, metallic: f32, roughness: f32) -> Self {
        self.metallic = metallic;
        self.roughness = roughness;
        self
    }

    /// Set the albedo texture
    pub fn with_albedo_map(mut self, texture: TextureHandle) -> Self {
        self.albedo_map = Some(texture);
        self
    }

    /// Texture handles for slots 0 to 3
    pub fn texture_slots(&self) -> [Option<TextureHandle>; 4] {
        [self.albedo_map, self.normal_map, self.metallic_map, self.roughness_map]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            metallic: 0.0,
            roughness: 0.5,
            albedo_map: None,
            normal_map: None,
            metallic_map: None,
            roughness_map: None,
        }
    }
}

/// Device-side mesh: static buffers plus the vertex array binding them
#[derive(Debug, Clone, PartialEq)]
pub struct GpuMesh {
    /// Static vertex buffer (attributes 0-3)
    pub vertex_buffer: BufferHandle,
    /// Index buffer
    pub index_buffer: BufferHandle,
    /// Vertex array used for individual draws
    pub vertex_array: VertexArrayHandle,
    /// Number of vertices
    pub vertex_count: u32,
    /// Number of indices
    pub index_count: u32,
    /// Material drawn when no override is given
    pub material: Option<MaterialHandle>,
}

/// A list of meshes drawn with one transform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    /// Meshes in draw order
    pub meshes: Vec<MeshHandle>,
}

impl Model {
    /// Create a model from mesh handles
    pub fn new(meshes: Vec<MeshHandle>) -> Self {
        Self { meshes }
    }
}

/// Arena owning every mesh and material the renderer can draw
#[derive(Debug, Default)]
pub struct RenderResources {
    meshes: SlotMap<MeshHandle, GpuMesh>,
    materials: SlotMap<MaterialHandle, Material>,
}

impl RenderResources {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a mesh to the device and store it
    ///
    /// Creates the static vertex and index buffers and a vertex array with
    /// the mesh stream bound at attribute locations 0-3. If any step fails,
    /// whatever was already created is released again.
    pub fn upload_mesh(&mut self, device: &mut dyn GraphicsDevice, mesh: &Mesh) -> RenderResult<MeshHandle> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(RenderError::ResourceCreationFailed("mesh has no geometry".to_string()));
        }

        let vertex_buffer = device.create_vertex_buffer_with_data(bytemuck::cast_slice(&mesh.vertices))?;
        let index_buffer = match device.create_index_buffer(&mesh.indices) {
            Ok(buffer) => buffer,
            Err(error) => {
                device.destroy_buffer(vertex_buffer);
                return Err(error);
            }
        };
        let vertex_array = match device.create_vertex_array() {
            Ok(vertex_array) => vertex_array,
            Err(error) => {
                release_buffers(device, vertex_buffer, index_buffer);
                return Err(error);
            }
        };
        let bound = device
            .add_vertex_buffer(vertex_array, vertex_buffer, &Vertex::layout(), 0, 0)
            .and_then(|_| device.set_index_buffer(vertex_array, index_buffer));
        if let Err(error) = bound {
            device.destroy_vertex_array(vertex_array);
            release_buffers(device, vertex_buffer, index_buffer);
            return Err(error);
        }

        let handle = self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_array,
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
            material: None,
        });
        log::debug!(
            "Uploaded mesh {:?}: {} vertices, {} indices",
            handle, mesh.vertex_count(), mesh.index_count()
        );
        Ok(handle)
    }

    /// Remove a mesh and release its vertex array and buffers
    ///
    /// Vertex arrays that other caches built from this mesh must be evicted
    /// before calling this; `FrameRenderer::remove_mesh` does both.
    pub fn remove_mesh(&mut self, device: &mut dyn GraphicsDevice, handle: MeshHandle) -> Option<GpuMesh> {
        let mesh = self.meshes.remove(handle)?;
        device.destroy_vertex_array(mesh.vertex_array);
        release_buffers(device, mesh.vertex_buffer, mesh.index_buffer);
        log::debug!("Removed mesh {:?}", handle);
        Some(mesh)
    }

    /// Look up a mesh
    pub fn mesh(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(handle)
    }

    /// Look up a mesh, reporting a missing one as an error
    pub fn require_mesh(&self, handle: MeshHandle) -> RenderResult<&GpuMesh> {
        self.meshes.get(handle).ok_or(RenderError::UnknownMesh)
    }

    /// Assign a mesh's default material
    pub fn set_mesh_material(&mut self, mesh: MeshHandle, material: Option<MaterialHandle>) -> RenderResult<()> {
        let gpu_mesh = self.meshes.get_mut(mesh).ok_or(RenderError::UnknownMesh)?;
        gpu_mesh.material = material;
        Ok(())
    }

    /// Store a material
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    /// Remove a material
    pub fn remove_material(&mut self, handle: MaterialHandle) -> Option<Material> {
        self.materials.remove(handle)
    }

    /// Look up a material
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    /// Mutable material access
    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    /// Number of stored meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of stored materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

fn release_buffers(device: &mut dyn GraphicsDevice, vertex_buffer: BufferHandle, index_buffer: BufferHandle) {
    device.destroy_buffer(vertex_buffer);
    device.destroy_buffer(index_buffer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{DeviceCommand, DeviceFailures, HeadlessDevice};

    #[test]
    fn test_upload_binds_mesh_stream() {
        let mut device = HeadlessDevice::new();
        let mut resources = RenderResources::new();

        let handle = resources.upload_mesh(&mut device, &Mesh::cube(1.0)).unwrap();
        let mesh = resources.mesh(handle).unwrap();
        assert_eq!(mesh.index_count, 36);
        assert_eq!(mesh.vertex_count, 24);

        assert!(device.commands().iter().any(|c| matches!(
            c,
            DeviceCommand::AddVertexBuffer { first_attribute: 0, attribute_slots: 4, divisor: 0, .. }
        )));
        assert_eq!(device.uploaded_bytes(), 24 * std::mem::size_of::<Vertex>());
    }

    #[test]
    fn test_removed_mesh_handle_stops_resolving() {
        let mut device = HeadlessDevice::new();
        let mut resources = RenderResources::new();

        let first = resources.upload_mesh(&mut device, &Mesh::cube(1.0)).unwrap();
        assert!(resources.remove_mesh(&mut device, first).is_some());
        let second = resources.upload_mesh(&mut device, &Mesh::cube(1.0)).unwrap();

        assert_ne!(first, second);
        assert!(matches!(resources.require_mesh(first), Err(RenderError::UnknownMesh)));
        assert!(resources.require_mesh(second).is_ok());
        assert_eq!(device.vertex_array_count(), 1);
    }

    #[test]
    fn test_remove_mesh_releases_buffers() {
        let mut device = HeadlessDevice::new();
        let mut resources = RenderResources::new();

        let handle = resources.upload_mesh(&mut device, &Mesh::cube(1.0)).unwrap();
        let mesh = resources.mesh(handle).unwrap().clone();
        assert_eq!(device.buffer_count(), 2);

        let removed = resources.remove_mesh(&mut device, handle).unwrap();
        assert_eq!(removed, mesh);
        assert_eq!(device.buffer_size(mesh.vertex_buffer), None);
        assert_eq!(device.buffer_size(mesh.index_buffer), None);
        assert!(!device.has_vertex_array(mesh.vertex_array));
        assert_eq!(device.buffer_count(), 0);
        assert!(resources.remove_mesh(&mut device, handle).is_none());
    }

    #[test]
    fn test_failed_upload_stores_nothing() {
        let mut device = HeadlessDevice::with_failures(DeviceFailures::VERTEX_ARRAY_CREATION);
        let mut resources = RenderResources::new();

        assert!(resources.upload_mesh(&mut device, &Mesh::cube(1.0)).is_err());
        assert!(resources.upload_mesh(&mut device, &Mesh::new(Vec::new(), Vec::new())).is_err());
        assert_eq!(resources.mesh_count(), 0);
        // Buffers created before the vertex array failed are released
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn test_failed_index_buffer_releases_vertex_buffer() {
        let mut device = HeadlessDevice::with_failures(DeviceFailures::INDEX_BUFFER_CREATION);
        let mut resources = RenderResources::new();

        assert!(resources.upload_mesh(&mut device, &Mesh::cube(1.0)).is_err());
        assert_eq!(device.buffer_count(), 0);
        assert!(device.commands().iter().any(|c| matches!(c, DeviceCommand::DestroyBuffer(_))));

        device.set_failures(DeviceFailures::empty());
        assert!(resources.upload_mesh(&mut device, &Mesh::cube(1.0)).is_ok());
        assert_eq!(device.buffer_count(), 2);
    }

    #[test]
    fn test_material_defaults_and_slots() {
        let mut resources = RenderResources::new();
        let handle = resources.add_material(Material::from_color(Vec4::new(1.0, 0.0, 0.0, 1.0)).with_pbr(0.2, 0.8));

        let material = resources.material(handle).unwrap();
        assert_eq!(material.roughness, 0.8);
        assert_eq!(material.texture_slots(), [None; 4]);
        assert_eq!(Material::default().roughness, 0.5);
    }
}
