//! Instanced rendering system
//!
//! Packs many copies of one mesh into a single draw call. Each submission
//! culls its items, packs the survivors into [`InstanceRecord`]s, uploads
//! them to the shared instance buffer once and issues one instanced draw
//! through a per-mesh vertex array.
//!
//! ## Instance Data Layout
//!
//! | Location | Attribute              | Contents                               |
//! |----------|------------------------|----------------------------------------|
//! | 4-7      | `a_InstanceMatrix`     | world transform, one column per slot   |
//! | 8        | `a_InstanceColor`      | RGBA color                             |
//! | 9        | `a_InstanceCustomData` | metallic, roughness, entity id, unused |

use bytemuck::{Pod, Zeroable};

use crate::core::config::DEFAULT_MAX_INSTANCES;
use crate::foundation::math::{Mat4, Vec4};
use crate::render::api::{
    BufferElement, BufferHandle, BufferLayout, GraphicsDevice, ShaderDataType, ShaderHandle,
    TextureHandle, VertexArrayHandle,
};
use crate::render::primitives::frustum::Frustum;
use crate::render::resources::arena::{Material, MeshHandle, RenderResources};
use crate::render::resources::vao_cache::RenderResourceCache;
use crate::render::shaders;
use crate::render::systems::culling::VisibilityCuller;
use crate::render::{RenderError, RenderResult};

/// Metallic value written into every instance
pub const INSTANCE_METALLIC: f32 = 0.0;

/// Roughness value written into every instance
pub const INSTANCE_ROUGHNESS: f32 = 0.5;

/// Per-instance data streamed to the GPU (96 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// World transform, column-major
    pub transform: [[f32; 4]; 4],
    /// RGBA color
    pub color: [f32; 4],
    /// `[metallic, roughness, entity id, 0]`
    pub custom: [f32; 4],
}

impl InstanceRecord {
    /// Pack one instance
    pub fn new(transform: &Mat4, color: Vec4, entity_id: i32) -> Self {
        Self {
            transform: (*transform).into(),
            color: color.into(),
            custom: [INSTANCE_METALLIC, INSTANCE_ROUGHNESS, entity_id as f32, 0.0],
        }
    }

    /// Attribute layout of the instance stream
    pub fn layout() -> BufferLayout {
        BufferLayout::new(vec![
            BufferElement::new(ShaderDataType::Mat4, "a_InstanceMatrix"),
            BufferElement::new(ShaderDataType::Float4, "a_InstanceColor"),
            BufferElement::new(ShaderDataType::Float4, "a_InstanceCustomData"),
        ])
    }

    /// Entity id stored in the custom channel
    pub fn entity_id(&self) -> i32 {
        self.custom[2] as i32
    }
}

/// Counters of the instancing path since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstancedStats {
    /// Items submitted, before culling
    pub total_instances: u32,
    /// Items that survived culling and the cap
    pub visible_instances: u32,
    /// Vertex arrays in the per-mesh cache
    pub cached_vaos: u32,
    /// Instance buffer uploads
    pub buffer_updates: u32,
    /// Instanced draw calls
    pub draw_calls: u32,
}

/// Device state created by [`BatchAccumulator::init`]
#[derive(Debug, Clone, Copy)]
struct InstancingResources {
    shader: ShaderHandle,
    instance_buffer: BufferHandle,
    fallback_texture: TextureHandle,
}

/// Culls, caps and packs instance submissions into single draw calls
#[derive(Debug)]
pub struct BatchAccumulator {
    resources: Option<InstancingResources>,
    layout: BufferLayout,
    records: Vec<InstanceRecord>,
    buffer_needs_update: bool,
    cache: RenderResourceCache,
    default_material: Option<Material>,
    max_instances: usize,
    stats: InstancedStats,
}

impl BatchAccumulator {
    /// Create an uninitialized accumulator
    ///
    /// `max_instances` is clamped to `1..=100_000`.
    pub fn new(max_instances: usize) -> Self {
        let max_instances = max_instances.clamp(1, DEFAULT_MAX_INSTANCES);
        Self {
            resources: None,
            layout: InstanceRecord::layout(),
            records: Vec::with_capacity(max_instances.min(1024)),
            buffer_needs_update: false,
            cache: RenderResourceCache::new(),
            default_material: None,
            max_instances,
            stats: InstancedStats::default(),
        }
    }

    /// Create the instanced shader, the shared instance buffer and the
    /// fallback texture
    ///
    /// On failure the accumulator stays uninitialized and every submission
    /// is rejected.
    pub fn init(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        log::info!("Initializing instanced renderer (max instances: {})", self.max_instances);

        let shader = device
            .create_shader(shaders::INSTANCED.name, shaders::INSTANCED.vertex, shaders::INSTANCED.fragment)
            .map_err(|e| {
                log::error!("Failed to create instanced shader: {}", e);
                e
            })?;
        let instance_buffer = device
            .create_vertex_buffer(self.max_instances * std::mem::size_of::<InstanceRecord>())
            .map_err(|e| {
                log::error!("Failed to create instance buffer: {}", e);
                e
            })?;
        let fallback_texture = device.create_white_texture()?;

        self.resources = Some(InstancingResources { shader, instance_buffer, fallback_texture });
        self.records.clear();
        self.reset_stats();
        Ok(())
    }

    /// Whether `init` succeeded and `shutdown` has not run since
    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Draw `transforms.len()` copies of `mesh` in one call
    ///
    /// Returns the number of instances drawn. Items are culled in order and
    /// packing stops at the instance cap with a warning. Empty or mismatched
    /// inputs, a missing mesh or an uninitialized accumulator abort before
    /// any statistic changes.
    pub fn submit(
        &mut self,
        device: &mut dyn GraphicsDevice,
        resources: &RenderResources,
        culler: &mut VisibilityCuller,
        frustum: Option<&Frustum>,
        transforms: &[Mat4],
        mesh: MeshHandle,
        colors: &[Vec4],
        entity_ids: &[i32],
    ) -> RenderResult<u32> {
        if transforms.is_empty() || transforms.len() != colors.len() || transforms.len() != entity_ids.len() {
            let error = RenderError::MismatchedSubmission {
                transforms: transforms.len(),
                colors: colors.len(),
                entity_ids: entity_ids.len(),
            };
            log::error!("{}", error);
            return Err(error);
        }

        let Some(state) = self.resources else {
            log::error!("Instanced submission before the instanced renderer was initialized");
            return Err(RenderError::NotInitialized("instanced renderer".to_string()));
        };
        let gpu_mesh = resources.require_mesh(mesh).map_err(|e| {
            log::error!("Instanced submission for {:?}: {}", mesh, e);
            e
        })?;

        let submitted = u32::try_from(transforms.len()).unwrap_or(u32::MAX);
        self.stats.total_instances = self.stats.total_instances.saturating_add(submitted);

        self.prepare_records(culler, frustum, transforms, colors, entity_ids);
        if self.records.is_empty() {
            log::trace!("All {} instances of {:?} culled", transforms.len(), mesh);
            return Ok(0);
        }
        let count = self.records.len() as u32;
        self.stats.visible_instances = self.stats.visible_instances.saturating_add(count);

        let vertex_array = self
            .cache
            .get_or_create(device, mesh, gpu_mesh, state.instance_buffer, &self.layout)
            .map_err(|e| {
                log::error!("Failed to create instanced vertex array for {:?}: {}", mesh, e);
                e
            })?;
        self.stats.cached_vaos = self.cache.len() as u32;

        if self.buffer_needs_update {
            device.set_vertex_buffer_data(state.instance_buffer, bytemuck::cast_slice(&self.records))?;
            self.buffer_needs_update = false;
            self.stats.buffer_updates = self.stats.buffer_updates.saturating_add(1);
        }

        self.render_instanced(device, state, vertex_array, gpu_mesh.index_count, count);
        self.stats.draw_calls = self.stats.draw_calls.saturating_add(1);

        log::trace!("Instanced draw of {:?}: {} of {} instances", mesh, count, transforms.len());
        Ok(count)
    }

    fn prepare_records(
        &mut self,
        culler: &mut VisibilityCuller,
        frustum: Option<&Frustum>,
        transforms: &[Mat4],
        colors: &[Vec4],
        entity_ids: &[i32],
    ) {
        self.records.clear();

        for ((transform, color), &entity_id) in transforms.iter().zip(colors).zip(entity_ids) {
            if !culler.is_visible(entity_id, transform, frustum) {
                continue;
            }
            if self.records.len() >= self.max_instances {
                log::warn!("Reached maximum instance limit: {}", self.max_instances);
                break;
            }
            self.records.push(InstanceRecord::new(transform, *color, entity_id));
        }

        self.buffer_needs_update = true;
    }

    fn render_instanced(
        &self,
        device: &mut dyn GraphicsDevice,
        state: InstancingResources,
        vertex_array: VertexArrayHandle,
        index_count: u32,
        instance_count: u32,
    ) {
        match self.default_material.as_ref().filter(|m| m.albedo_map.is_some()) {
            Some(material) => {
                for (slot, texture) in material.texture_slots().into_iter().enumerate() {
                    if let Some(texture) = texture {
                        device.bind_texture(texture, slot as u32);
                    }
                }
            }
            None => {
                for slot in 0..4 {
                    device.bind_texture(state.fallback_texture, slot);
                }
            }
        }

        device.bind_shader(state.shader);
        device.set_uniform_int(state.shader, "u_AlbedoMap", 0);
        device.set_uniform_int(state.shader, "u_NormalMap", 1);
        device.set_uniform_int(state.shader, "u_MetallicMap", 2);
        device.set_uniform_int(state.shader, "u_RoughnessMap", 3);
        device.draw_instanced(vertex_array, index_count, instance_count);
    }

    /// Destroy every cached per-mesh vertex array
    pub fn clear_cache(&mut self, device: &mut dyn GraphicsDevice) {
        self.cache.clear_cache(device);
        self.stats.cached_vaos = 0;
    }

    /// Destroy the vertex array cached for `mesh`, if any
    pub fn evict_mesh(&mut self, device: &mut dyn GraphicsDevice, mesh: MeshHandle) -> bool {
        let evicted = self.cache.remove(device, mesh);
        self.stats.cached_vaos = self.cache.len() as u32;
        evicted
    }

    /// Release cached state and the instance buffer; the accumulator must be
    /// re-initialized to draw
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        log::info!("Shutting down instanced renderer");
        self.clear_cache(device);
        self.records.clear();
        if let Some(state) = self.resources.take() {
            device.destroy_buffer(state.instance_buffer);
        }
    }

    /// Material whose textures are bound for instanced draws
    pub fn set_default_material(&mut self, material: Option<Material>) {
        self.default_material = material;
    }

    /// Instance cap per submission
    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Records packed by the most recent submission
    pub fn last_records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Per-mesh vertex array cache
    pub fn vertex_array_cache(&self) -> &RenderResourceCache {
        &self.cache
    }

    /// Counters since the last reset
    pub fn stats(&self) -> InstancedStats {
        self.stats
    }

    /// Zero the counters; the cached VAO count is kept
    pub fn reset_stats(&mut self) {
        self.stats = InstancedStats {
            cached_vaos: self.cache.len() as u32,
            ..InstancedStats::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InvariantPolicy;
    use crate::foundation::logging::capture;
    use crate::foundation::math::Vec3;
    use crate::render::backends::{DeviceCommand, DeviceFailures, HeadlessDevice};
    use crate::render::primitives::camera::Camera3D;
    use crate::render::primitives::mesh::Mesh;
    use log::Level;

    struct Fixture {
        device: HeadlessDevice,
        resources: RenderResources,
        culler: VisibilityCuller,
        camera: Camera3D,
        cube: MeshHandle,
    }

    fn fixture() -> Fixture {
        let mut device = HeadlessDevice::new();
        let mut resources = RenderResources::new();
        let cube = resources.upload_mesh(&mut device, &Mesh::cube(1.0)).unwrap();
        let mut camera = Camera3D::new(60.0, 1.0, 0.1, 100.0);
        camera.set_position(Vec3::new(0.0, 0.0, 10.0));
        Fixture {
            device,
            resources,
            culler: VisibilityCuller::new(InvariantPolicy::Log),
            camera,
            cube,
        }
    }

    fn batch(count: usize, position: Vec3) -> (Vec<Mat4>, Vec<Vec4>, Vec<i32>) {
        let transforms = vec![Mat4::new_translation(&position); count];
        let colors = vec![Vec4::new(1.0, 0.5, 0.25, 1.0); count];
        let ids = (0..count as i32).collect();
        (transforms, colors, ids)
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(std::mem::size_of::<InstanceRecord>(), 96);
        assert_eq!(InstanceRecord::layout().stride(), 96);

        let record = InstanceRecord::new(&Mat4::identity(), Vec4::new(1.0, 0.0, 0.0, 1.0), 42);
        assert_eq!(record.custom, [0.0, 0.5, 42.0, 0.0]);
        assert_eq!(record.entity_id(), 42);
    }

    #[test]
    fn test_single_upload_and_draw() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();
        f.device.clear_commands();

        let (transforms, colors, ids) = batch(10, Vec3::zeros());
        let drawn = accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();

        assert_eq!(drawn, 10);
        let uploads: Vec<usize> = f
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::UploadVertexData { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![10 * std::mem::size_of::<InstanceRecord>()]);
        assert!(f.device.commands().iter().any(|c| matches!(
            c,
            DeviceCommand::DrawInstanced { index_count: 36, instance_count: 10, .. }
        )));
        assert_eq!(f.device.draw_call_count(), 1);

        let stats = accumulator.stats();
        assert_eq!(stats.total_instances, 10);
        assert_eq!(stats.visible_instances, 10);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.buffer_updates, 1);
        assert_eq!(stats.cached_vaos, 1);
    }

    #[test]
    fn test_instance_cap() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(8);
        accumulator.init(&mut f.device).unwrap();

        let (transforms, colors, ids) = batch(20, Vec3::zeros());
        capture::start();
        let drawn = accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();

        assert_eq!(drawn, 8);
        assert_eq!(accumulator.last_records().len(), 8);
        assert_eq!(accumulator.max_instances(), 8);
        assert_eq!(capture::messages(Level::Warn), vec!["Reached maximum instance limit: 8"]);
    }

    #[test]
    fn test_mismatched_inputs_leave_stats_unchanged() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();
        f.device.clear_commands();

        let (transforms, _, ids) = batch(3, Vec3::zeros());
        let colors = vec![Vec4::zeros(); 2];
        let result = accumulator.submit(
            &mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids,
        );

        assert!(matches!(result, Err(RenderError::MismatchedSubmission { transforms: 3, colors: 2, entity_ids: 3 })));
        assert_eq!(accumulator.stats(), InstancedStats::default());
        assert_eq!(f.culler.total_count(), 0);
        assert_eq!(f.device.draw_call_count(), 0);

        let empty = accumulator.submit(&mut f.device, &f.resources, &mut f.culler, None, &[], f.cube, &[], &[]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_culled_items_are_not_packed() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();

        let mut transforms = vec![Mat4::identity(); 4];
        transforms.push(Mat4::new_translation(&Vec3::new(0.0, 0.0, -1000.0)));
        let colors = vec![Vec4::new(1.0, 1.0, 1.0, 1.0); 5];
        let ids = vec![0, 1, 2, 3, 4];

        let drawn = accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();

        assert_eq!(drawn, 4);
        assert!(accumulator.last_records().iter().all(|r| r.entity_id() != 4));
        assert_eq!(f.culler.culled_count(), 1);
    }

    #[test]
    fn test_fully_culled_batch_draws_nothing() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();

        let (transforms, colors, ids) = batch(3, Vec3::new(0.0, 0.0, 500.0));
        let drawn = accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();

        assert_eq!(drawn, 0);
        assert_eq!(f.device.draw_call_count(), 0);
        assert_eq!(accumulator.stats().total_instances, 3);
        assert_eq!(accumulator.stats().draw_calls, 0);
    }

    #[test]
    fn test_uninitialized_and_unknown_mesh_rejected() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        let (transforms, colors, ids) = batch(2, Vec3::zeros());

        let result = accumulator.submit(
            &mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids,
        );
        assert!(matches!(result, Err(RenderError::NotInitialized(_))));

        accumulator.init(&mut f.device).unwrap();
        assert!(f.resources.remove_mesh(&mut f.device, f.cube).is_some());
        let result = accumulator.submit(
            &mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids,
        );
        assert!(matches!(result, Err(RenderError::UnknownMesh)));
        assert_eq!(accumulator.stats().total_instances, 0);
    }

    #[test]
    fn test_failed_init_leaves_accumulator_unusable() {
        let mut device = HeadlessDevice::with_failures(DeviceFailures::SHADER_CREATION);
        let mut accumulator = BatchAccumulator::new(100);

        assert!(accumulator.init(&mut device).is_err());
        assert!(!accumulator.is_initialized());
    }

    #[test]
    fn test_vao_reused_across_submissions_and_cleared() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();
        let (transforms, colors, ids) = batch(5, Vec3::zeros());

        for _ in 0..3 {
            accumulator
                .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
                .unwrap();
        }
        assert_eq!(accumulator.vertex_array_cache().len(), 1);
        assert_eq!(accumulator.stats().buffer_updates, 3);
        assert_eq!(accumulator.stats().draw_calls, 3);

        accumulator.clear_cache(&mut f.device);
        assert_eq!(accumulator.stats().cached_vaos, 0);

        // Mesh buffers plus the instance buffer
        assert_eq!(f.device.buffer_count(), 3);
        accumulator.shutdown(&mut f.device);
        assert!(!accumulator.is_initialized());
        assert_eq!(f.device.buffer_count(), 2);
    }

    #[test]
    fn test_evict_mesh_drops_its_vertex_array() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();
        let (transforms, colors, ids) = batch(3, Vec3::zeros());
        accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();
        assert_eq!(accumulator.stats().cached_vaos, 1);

        assert!(accumulator.evict_mesh(&mut f.device, f.cube));
        assert!(!accumulator.vertex_array_cache().contains(f.cube));
        assert_eq!(accumulator.stats().cached_vaos, 0);
        assert!(!accumulator.evict_mesh(&mut f.device, f.cube));
    }

    #[test]
    fn test_textured_default_material_binds_its_maps() {
        let mut f = fixture();
        let mut accumulator = BatchAccumulator::new(100);
        accumulator.init(&mut f.device).unwrap();
        let albedo = f.device.create_white_texture().unwrap();
        accumulator.set_default_material(Some(Material::default().with_albedo_map(albedo)));
        f.device.clear_commands();

        let (transforms, colors, ids) = batch(2, Vec3::zeros());
        accumulator
            .submit(&mut f.device, &f.resources, &mut f.culler, Some(f.camera.frustum()), &transforms, f.cube, &colors, &ids)
            .unwrap();

        let bound: Vec<_> = f
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::BindTexture { texture, slot } => Some((*texture, *slot)),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec![(albedo, 0)]);
    }
}
