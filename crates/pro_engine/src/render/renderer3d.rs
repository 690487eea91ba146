//! Frame renderer
//!
//! [`FrameRenderer`] is the owned per-frame coordinator. Draw sites receive it
//! by `&mut`, bracket their draws with [`FrameRenderer::begin_scene`] and
//! [`FrameRenderer::end_scene`], and read statistics afterwards. It owns the
//! graphics device, the resource arena, the visibility culler, the instance
//! batcher and the debug line batch.

use std::collections::HashMap;

use crate::core::config::{InvariantPolicy, LightingConfig, RendererConfig};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::api::{GraphicsDevice, PolygonMode, ShaderHandle, TextureHandle, UniformBufferHandle};
use crate::render::primitives::{Camera3D, Camera3DController, Frustum, Mesh};
use crate::render::resources::{
    CameraUniform, LightUniform, Material, MaterialHandle, MeshHandle, RenderResourceCache, RenderResources,
    CAMERA_BINDING, LIGHT_BINDING,
};
use crate::render::shaders;
use crate::render::systems::{BatchAccumulator, FrameStatistics, InstancedStats, LineBatch, VisibilityCuller};
use crate::render::{RenderError, RenderResult};
use crate::scene::ModelRendererComponent;

/// Frame state of the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Between frames; draws are rejected
    Idle,
    /// Between `begin_scene` and `end_scene`
    SceneActive,
}

/// Device objects created at construction
#[derive(Debug, Clone, Copy)]
struct RendererHandles {
    mesh_shader: ShaderHandle,
    wireframe_shader: ShaderHandle,
    camera_uniform: UniformBufferHandle,
    light_uniform: UniformBufferHandle,
    white_texture: TextureHandle,
}

/// A flat-colored draw deferred to `end_scene` by auto-instancing
#[derive(Debug, Clone, Copy)]
struct RenderItem {
    transform: Mat4,
    mesh: MeshHandle,
    color: Vec4,
    entity_id: i32,
}

/// Per-frame 3D renderer
///
/// # Example
///
/// ```
/// use pro_engine::core::RendererConfig;
/// use pro_engine::foundation::math::{Vec3, Vec4};
/// use pro_engine::render::{Camera3D, FrameRenderer, HeadlessDevice};
///
/// let mut renderer = FrameRenderer::new(Box::new(HeadlessDevice::new()), RendererConfig::default())?;
/// let mut camera = Camera3D::new(60.0, 16.0 / 9.0, 0.1, 100.0);
/// camera.set_position(Vec3::new(0.0, 0.0, 5.0));
///
/// renderer.begin_scene(&camera);
/// renderer.draw_cube_at(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), Vec4::new(1.0, 0.0, 0.0, 1.0), 0);
/// renderer.end_scene();
///
/// assert_eq!(renderer.stats().visible_mesh_count, 1);
/// # Ok::<(), pro_engine::render::RenderError>(())
/// ```
pub struct FrameRenderer {
    device: Box<dyn GraphicsDevice>,
    resources: RenderResources,
    handles: RendererHandles,

    state: SceneState,
    policy: InvariantPolicy,
    active_frustum: Option<Frustum>,
    camera_position: Vec3,

    culler: VisibilityCuller,
    instancer: BatchAccumulator,
    lines: LineBatch,

    default_material: Material,
    cube_mesh: MeshHandle,
    sphere_mesh: MeshHandle,

    lighting: LightingConfig,
    wireframe: bool,
    auto_instancing: bool,
    instancing_threshold: u32,
    render_queue: Vec<RenderItem>,

    stats: FrameStatistics,
    last_frame_stats: FrameStatistics,
}

impl FrameRenderer {
    /// Create the renderer and every device object it needs
    ///
    /// Compiles the mesh, wireframe, line and instanced programs, creates the
    /// camera and light uniform buffers and the white fallback texture, and
    /// uploads the cube and sphere primitives.
    pub fn new(mut device: Box<dyn GraphicsDevice>, config: RendererConfig) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;
        log::info!("Initializing 3D renderer");

        let dev = device.as_mut();
        let mesh_shader = dev.create_shader(shaders::MESH.name, shaders::MESH.vertex, shaders::MESH.fragment)?;
        let wireframe_shader =
            dev.create_shader(shaders::WIREFRAME.name, shaders::WIREFRAME.vertex, shaders::WIREFRAME.fragment)?;
        let camera_uniform = dev.create_uniform_buffer(std::mem::size_of::<CameraUniform>(), CAMERA_BINDING)?;
        let light_uniform = dev.create_uniform_buffer(std::mem::size_of::<LightUniform>(), LIGHT_BINDING)?;
        let white_texture = dev.create_white_texture()?;

        let mut lines = LineBatch::new(config.max_line_vertices, config.line_width);
        lines.init(dev)?;

        let mut instancer = BatchAccumulator::new(config.max_instances);
        instancer.init(dev)?;

        let mut resources = RenderResources::new();
        let cube = Mesh::cube(1.0);
        let sphere = Mesh::sphere(0.5, 16, 16);
        let cube_mesh = resources.upload_mesh(dev, &cube)?;
        let sphere_mesh = resources.upload_mesh(dev, &sphere)?;
        log::info!("Primitive meshes created:");
        log::info!("  Cube: {} vertices, {} indices", cube.vertex_count(), cube.index_count());
        log::info!("  Sphere: {} vertices, {} indices", sphere.vertex_count(), sphere.index_count());

        dev.set_uniform_buffer_data(light_uniform, bytemuck::bytes_of(&LightUniform::from(&config.lighting)))?;

        log::info!("3D renderer initialized (max instances: {})", instancer.max_instances());
        Ok(Self {
            device,
            resources,
            handles: RendererHandles {
                mesh_shader,
                wireframe_shader,
                camera_uniform,
                light_uniform,
                white_texture,
            },
            state: SceneState::Idle,
            policy: config.invariant_policy,
            active_frustum: None,
            camera_position: Vec3::zeros(),
            culler: VisibilityCuller::new(config.invariant_policy),
            instancer,
            lines,
            default_material: Material::default(),
            cube_mesh,
            sphere_mesh,
            lighting: config.lighting,
            wireframe: config.wireframe,
            auto_instancing: config.auto_instancing,
            instancing_threshold: config.instancing_threshold.max(1),
            render_queue: Vec::new(),
            stats: FrameStatistics::default(),
            last_frame_stats: FrameStatistics::default(),
        })
    }

    // ------------------------------------------------------------------
    // Scene lifecycle
    // ------------------------------------------------------------------

    /// Start a frame seen through `camera`
    ///
    /// Uploads the camera and light blocks, clears the line batch and the
    /// culling counters, and captures the camera's frustum for culling.
    pub fn begin_scene(&mut self, camera: &Camera3D) {
        if self.state == SceneState::SceneActive {
            self.policy.report("begin_scene called while a scene is already active");
            return;
        }

        let camera_data = CameraUniform::new(&camera.view_projection_matrix(), camera.position());
        let light_data = LightUniform::from(&self.lighting);
        let uploaded = self
            .device
            .set_uniform_buffer_data(self.handles.camera_uniform, bytemuck::bytes_of(&camera_data))
            .and_then(|_| {
                self.device
                    .set_uniform_buffer_data(self.handles.light_uniform, bytemuck::bytes_of(&light_data))
            });
        if let Err(e) = uploaded {
            log::error!("Failed to upload scene uniforms: {}", e);
        }

        self.active_frustum = Some(*camera.frustum());
        self.camera_position = camera.position();
        self.lines.reset();
        self.render_queue.clear();
        self.culler.reset_counters();
        self.state = SceneState::SceneActive;
    }

    /// Start a frame seen through a controller's camera
    pub fn begin_scene_with_controller(&mut self, controller: &Camera3DController) {
        self.begin_scene(controller.camera());
    }

    /// Finish the frame
    ///
    /// Flushes auto-instanced draws, snapshots the culling counters into the
    /// statistics, then uploads and draws the debug lines.
    pub fn end_scene(&mut self) {
        if self.state != SceneState::SceneActive {
            self.policy.report("end_scene called without a matching begin_scene");
            return;
        }

        self.flush_render_queue();

        self.stats.mesh_count = self.culler.total_count();
        self.stats.visible_mesh_count = self.culler.visible_count();
        self.stats.culled_mesh_count = self.culler.culled_count();

        match self.lines.flush(self.device.as_mut()) {
            Ok(0) => {}
            Ok(count) => {
                self.stats.draw_calls = self.stats.draw_calls.saturating_add(1);
                self.stats.line_vertex_count = self.stats.line_vertex_count.saturating_add(count);
            }
            Err(e) => log::error!("Failed to flush debug lines: {}", e),
        }

        self.active_frustum = None;
        self.state = SceneState::Idle;
    }

    /// Current frame state
    pub fn scene_state(&self) -> SceneState {
        self.state
    }

    fn scene_active(&self, operation: &str) -> bool {
        if self.state == SceneState::SceneActive {
            return true;
        }
        self.policy.report(&format!("{} called outside begin_scene/end_scene", operation));
        false
    }

    // ------------------------------------------------------------------
    // Individual draws
    // ------------------------------------------------------------------

    /// Draw a mesh with a flat color
    ///
    /// With auto-instancing enabled the draw is queued until `end_scene`.
    pub fn draw_mesh(&mut self, transform: &Mat4, mesh: MeshHandle, color: Vec4, entity_id: i32) {
        if !self.scene_active("draw_mesh") {
            return;
        }
        if self.auto_instancing {
            self.render_queue.push(RenderItem { transform: *transform, mesh, color, entity_id });
            return;
        }
        self.draw_colored(transform, mesh, color, entity_id);
    }

    /// Draw a mesh with a material; `None` uses the default material
    pub fn draw_mesh_with_material(
        &mut self,
        transform: &Mat4,
        mesh: MeshHandle,
        material: Option<MaterialHandle>,
        entity_id: i32,
    ) {
        if !self.scene_active("draw_mesh_with_material") {
            return;
        }
        if !self.culler.is_visible(entity_id, transform, self.active_frustum.as_ref()) {
            return;
        }

        let material = match material {
            Some(handle) => match self.resources.material(handle) {
                Some(material) => material.clone(),
                None => {
                    log::error!("draw_mesh_with_material: {}", RenderError::UnknownMaterial);
                    return;
                }
            },
            None => self.default_material.clone(),
        };
        if self.draw_mesh_internal(transform, mesh, &material, entity_id) {
            self.stats.individual_objects = self.stats.individual_objects.saturating_add(1);
        }
    }

    /// Draw a mesh placed by position, scale and Euler rotation in degrees
    pub fn draw_mesh_trs(
        &mut self,
        position: Vec3,
        scale: Vec3,
        rotation_degrees: Vec3,
        mesh: MeshHandle,
        color: Vec4,
        entity_id: i32,
    ) {
        let transform = utils::transform_from_trs_degrees(position, scale, rotation_degrees);
        self.draw_mesh(&transform, mesh, color, entity_id);
    }

    /// Material variant of [`FrameRenderer::draw_mesh_trs`]
    pub fn draw_mesh_trs_with_material(
        &mut self,
        position: Vec3,
        scale: Vec3,
        rotation_degrees: Vec3,
        mesh: MeshHandle,
        material: Option<MaterialHandle>,
        entity_id: i32,
    ) {
        let transform = utils::transform_from_trs_degrees(position, scale, rotation_degrees);
        self.draw_mesh_with_material(&transform, mesh, material, entity_id);
    }

    /// Draw the unit cube primitive
    pub fn draw_cube(&mut self, transform: &Mat4, color: Vec4, entity_id: i32) {
        self.draw_mesh(transform, self.cube_mesh, color, entity_id);
    }

    /// Draw a cube of `size` centered at `position`
    pub fn draw_cube_at(&mut self, position: Vec3, size: Vec3, color: Vec4, entity_id: i32) {
        let transform = utils::transform_from_translation_scale(position, size);
        self.draw_cube(&transform, color, entity_id);
    }

    /// Draw the unit cube primitive with a material
    pub fn draw_cube_with_material(&mut self, transform: &Mat4, material: Option<MaterialHandle>, entity_id: i32) {
        self.draw_mesh_with_material(transform, self.cube_mesh, material, entity_id);
    }

    /// Draw the sphere primitive (radius 0.5 before scaling)
    pub fn draw_sphere(&mut self, transform: &Mat4, color: Vec4, entity_id: i32) {
        self.draw_mesh(transform, self.sphere_mesh, color, entity_id);
    }

    /// Draw a sphere at `position`, scaling the primitive uniformly by `radius`
    pub fn draw_sphere_at(&mut self, position: Vec3, radius: f32, color: Vec4, entity_id: i32) {
        let transform = utils::transform_from_translation_scale(position, Vec3::repeat(radius));
        self.draw_sphere(&transform, color, entity_id);
    }

    /// Draw the sphere primitive with a material
    pub fn draw_sphere_with_material(&mut self, transform: &Mat4, material: Option<MaterialHandle>, entity_id: i32) {
        self.draw_mesh_with_material(transform, self.sphere_mesh, material, entity_id);
    }

    /// Draw every mesh of a model
    ///
    /// Each mesh uses the component's override material, else its own
    /// material, else the default material.
    pub fn draw_model(&mut self, transform: &Mat4, component: &ModelRendererComponent, entity_id: i32) {
        let Some(model) = component.model.as_ref() else {
            return;
        };

        for &mesh in &model.meshes {
            let material = component
                .override_material
                .or_else(|| self.resources.mesh(mesh).and_then(|m| m.material));
            self.draw_mesh_with_material(transform, mesh, material, entity_id);
        }
    }

    fn draw_colored(&mut self, transform: &Mat4, mesh: MeshHandle, color: Vec4, entity_id: i32) {
        if !self.culler.is_visible(entity_id, transform, self.active_frustum.as_ref()) {
            return;
        }

        let material = Material {
            albedo_color: color,
            ..self.default_material.clone()
        };
        if self.draw_mesh_internal(transform, mesh, &material, entity_id) {
            self.stats.individual_objects = self.stats.individual_objects.saturating_add(1);
        }
    }

    /// Bind material and shader state and issue one indexed draw
    ///
    /// Returns false if the mesh does not resolve.
    fn draw_mesh_internal(&mut self, transform: &Mat4, mesh: MeshHandle, material: &Material, entity_id: i32) -> bool {
        let (vertex_array, vertex_count, index_count) = match self.resources.require_mesh(mesh) {
            Ok(gpu_mesh) => (gpu_mesh.vertex_array, gpu_mesh.vertex_count, gpu_mesh.index_count),
            Err(e) => {
                log::error!("Draw of {:?} skipped: {}", mesh, e);
                return false;
            }
        };

        let device = self.device.as_mut();
        for (slot, texture) in material.texture_slots().into_iter().enumerate() {
            device.bind_texture(texture.unwrap_or(self.handles.white_texture), slot as u32);
        }

        if self.wireframe {
            let shader = self.handles.wireframe_shader;
            device.set_polygon_mode(PolygonMode::Line);
            device.bind_shader(shader);
            device.set_uniform_mat4(shader, "u_Transform", transform);
            device.set_uniform_float4(shader, "u_Color", material.albedo_color);
            device.set_uniform_int(shader, "u_EntityID", entity_id);
        } else {
            let shader = self.handles.mesh_shader;
            device.set_polygon_mode(PolygonMode::Fill);
            device.bind_shader(shader);
            device.set_uniform_mat4(shader, "u_Transform", transform);
            device.set_uniform_float4(shader, "u_MaterialAlbedoColor", material.albedo_color);
            device.set_uniform_float(shader, "u_MaterialMetallic", material.metallic);
            device.set_uniform_float(shader, "u_MaterialRoughness", material.roughness);
            device.set_uniform_int(shader, "u_AlbedoMap", 0);
            device.set_uniform_int(shader, "u_EntityID", entity_id);
        }

        device.draw_indexed(vertex_array, index_count);

        self.stats.draw_calls = self.stats.draw_calls.saturating_add(1);
        self.stats.individual_draw_calls = self.stats.individual_draw_calls.saturating_add(1);
        self.stats.vertex_count = self.stats.vertex_count.saturating_add(u64::from(vertex_count));
        self.stats.index_count = self.stats.index_count.saturating_add(u64::from(index_count));
        true
    }

    // ------------------------------------------------------------------
    // Instanced draws
    // ------------------------------------------------------------------

    /// Draw many copies of a mesh in one call
    ///
    /// Returns the number of instances that survived culling and the cap.
    pub fn draw_instanced(
        &mut self,
        transforms: &[Mat4],
        mesh: MeshHandle,
        colors: &[Vec4],
        entity_ids: &[i32],
    ) -> RenderResult<u32> {
        if !self.scene_active("draw_instanced") {
            return Err(RenderError::InvalidState("draw_instanced outside a scene".to_string()));
        }
        self.submit_instanced(transforms, mesh, colors, entity_ids)
    }

    fn submit_instanced(
        &mut self,
        transforms: &[Mat4],
        mesh: MeshHandle,
        colors: &[Vec4],
        entity_ids: &[i32],
    ) -> RenderResult<u32> {
        let drawn = self.instancer.submit(
            self.device.as_mut(),
            &self.resources,
            &mut self.culler,
            self.active_frustum.as_ref(),
            transforms,
            mesh,
            colors,
            entity_ids,
        )?;

        if drawn > 0 {
            if let Some(gpu_mesh) = self.resources.mesh(mesh) {
                let instances = u64::from(drawn);
                self.stats.vertex_count =
                    self.stats.vertex_count.saturating_add(u64::from(gpu_mesh.vertex_count) * instances);
                self.stats.index_count =
                    self.stats.index_count.saturating_add(u64::from(gpu_mesh.index_count) * instances);
            }
            self.stats.draw_calls = self.stats.draw_calls.saturating_add(1);
            self.stats.instanced_draw_calls = self.stats.instanced_draw_calls.saturating_add(1);
            self.stats.total_instances = self.stats.total_instances.saturating_add(drawn);
            self.stats.instanced_objects = self.stats.instanced_objects.saturating_add(drawn);
        }
        Ok(drawn)
    }

    /// Group queued flat-color draws by mesh and draw them
    ///
    /// Groups reaching the instancing threshold go through the instancer in
    /// chunks of at most `max_instances`; the rest are drawn one by one.
    fn flush_render_queue(&mut self) {
        if self.render_queue.is_empty() {
            return;
        }
        let mut queue = std::mem::take(&mut self.render_queue);

        let mut group_of: HashMap<MeshHandle, usize> = HashMap::new();
        let mut groups: Vec<(MeshHandle, Vec<RenderItem>)> = Vec::new();
        for item in queue.drain(..) {
            let index = *group_of.entry(item.mesh).or_insert_with(|| {
                groups.push((item.mesh, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(item);
        }

        let threshold = self.instancing_threshold as usize;
        let chunk_size = self.instancer.max_instances();
        for (mesh, items) in groups {
            if items.len() < threshold {
                for item in items {
                    self.draw_colored(&item.transform, item.mesh, item.color, item.entity_id);
                }
                continue;
            }

            for chunk in items.chunks(chunk_size) {
                let transforms: Vec<Mat4> = chunk.iter().map(|i| i.transform).collect();
                let colors: Vec<Vec4> = chunk.iter().map(|i| i.color).collect();
                let entity_ids: Vec<i32> = chunk.iter().map(|i| i.entity_id).collect();
                if let Err(e) = self.submit_instanced(&transforms, mesh, &colors, &entity_ids) {
                    log::error!("Auto-instanced draw of {:?} failed: {}", mesh, e);
                }
            }
        }

        // Keep the allocation for the next frame
        self.render_queue = queue;
    }

    // ------------------------------------------------------------------
    // Debug lines
    // ------------------------------------------------------------------

    /// Queue a line segment for `end_scene`
    pub fn draw_line_3d(&mut self, p0: Vec3, p1: Vec3, color: Vec4, entity_id: i32) {
        if self.scene_active("draw_line_3d") {
            self.lines.push_line(p0, p1, color, entity_id);
        }
    }

    /// Queue the edges of an axis-aligned box of `size` centered at `position`
    pub fn draw_box(&mut self, position: Vec3, size: Vec3, color: Vec4, entity_id: i32) {
        if self.scene_active("draw_box") {
            self.lines.push_box(position, size, color, entity_id);
        }
    }

    /// Queue the edges of the unit cube under `transform`
    pub fn draw_box_transform(&mut self, transform: &Mat4, color: Vec4, entity_id: i32) {
        if self.scene_active("draw_box_transform") {
            self.lines.push_box_transform(transform, color, entity_id);
        }
    }

    // ------------------------------------------------------------------
    // Visibility queries
    // ------------------------------------------------------------------

    /// Whether a point is inside the active frustum; true without one
    pub fn is_point_visible(&self, point: &Vec3) -> bool {
        self.active_frustum.map_or(true, |f| f.contains_point(point))
    }

    /// Whether a sphere touches the active frustum; true without one
    pub fn is_sphere_visible(&self, center: &Vec3, radius: f32) -> bool {
        self.active_frustum.map_or(true, |f| f.intersects_sphere(center, radius))
    }

    /// Whether a box touches the active frustum; true without one
    pub fn is_aabb_visible(&self, min: &Vec3, max: &Vec3) -> bool {
        self.active_frustum.map_or(true, |f| f.intersects_aabb(min, max))
    }

    /// Sphere test of an entity without touching the culling cache
    ///
    /// The radius is scaled by the transform's largest axis scale.
    pub fn is_entity_visible(&self, _entity_id: i32, transform: &Mat4, bounding_radius: f32) -> bool {
        self.is_sphere_visible(&transform.translation_part(), bounding_radius * transform.max_axis_scale())
    }

    // ------------------------------------------------------------------
    // Lighting and toggles
    // ------------------------------------------------------------------

    /// Move the point light; applied at the next `begin_scene`
    pub fn set_point_light_position(&mut self, position: Vec3) {
        self.lighting.point_light_position = position;
    }

    /// Set the ambient term; applied at the next `begin_scene`
    pub fn set_ambient_light(&mut self, color: Vec3, intensity: f32) {
        self.lighting.ambient_color = color;
        self.lighting.ambient_intensity = intensity;
    }

    /// Current lighting state
    pub fn lighting(&self) -> &LightingConfig {
        &self.lighting
    }

    /// Toggle wireframe rendering of individual draws
    pub fn enable_wireframe(&mut self, enable: bool) {
        self.wireframe = enable;
    }

    /// Whether individual draws render as wireframe
    pub fn is_wireframe_enabled(&self) -> bool {
        self.wireframe
    }

    /// Toggle deferral of flat-color draws to `end_scene`
    pub fn enable_auto_instancing(&mut self, enable: bool) {
        self.auto_instancing = enable;
    }

    /// Whether flat-color draws are deferred and grouped
    pub fn is_auto_instancing_enabled(&self) -> bool {
        self.auto_instancing
    }

    /// Minimum draws of one mesh that turn into an instanced draw
    pub fn set_instancing_threshold(&mut self, threshold: u32) {
        self.instancing_threshold = threshold.max(1);
    }

    /// Current auto-instancing threshold
    pub fn instancing_threshold(&self) -> u32 {
        self.instancing_threshold
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Statistics of the current frame
    pub fn stats(&self) -> FrameStatistics {
        self.stats
    }

    /// Statistics saved by the last `reset_stats`
    pub fn last_frame_stats(&self) -> FrameStatistics {
        self.last_frame_stats
    }

    /// Save the current statistics as the last frame's and zero them
    pub fn reset_stats(&mut self) {
        self.last_frame_stats = self.stats;
        self.stats = FrameStatistics::default();
        self.instancer.reset_stats();
    }

    /// Instancing path counters
    pub fn instanced_stats(&self) -> InstancedStats {
        self.instancer.stats()
    }

    /// Per-mesh vertex arrays built by instanced draws
    pub fn instanced_vertex_arrays(&self) -> &RenderResourceCache {
        self.instancer.vertex_array_cache()
    }

    /// Entities tested since `begin_scene`
    pub fn total_mesh_count(&self) -> u32 {
        self.culler.total_count()
    }

    /// Entities that passed since `begin_scene`
    pub fn visible_mesh_count(&self) -> u32 {
        self.culler.visible_count()
    }

    /// Entities culled since `begin_scene`
    pub fn culled_mesh_count(&self) -> u32 {
        self.culler.culled_count()
    }

    /// Percentage of entities culled since `begin_scene`
    pub fn culling_efficiency(&self) -> f32 {
        self.culler.culling_efficiency()
    }

    /// Percentage of this frame's objects drawn through instancing
    pub fn instancing_efficiency(&self) -> f32 {
        self.stats.instancing_efficiency()
    }

    // ------------------------------------------------------------------
    // Caches and resources
    // ------------------------------------------------------------------

    /// Recompute an entity's bounding radius on its next test
    pub fn invalidate_entity_bounds(&mut self, entity_id: i32) {
        self.culler.invalidate_entity_bounds(entity_id);
    }

    /// Drop all cached culling records
    pub fn clear_culling_data(&mut self) {
        self.culler.clear_culling_data();
    }

    /// Destroy every cached instanced vertex array
    pub fn clear_instance_cache(&mut self) {
        self.instancer.clear_cache(self.device.as_mut());
    }

    /// Upload a mesh
    pub fn upload_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle> {
        self.resources.upload_mesh(self.device.as_mut(), mesh)
    }

    /// Remove a mesh; handles to it stop resolving
    ///
    /// Releases the mesh's buffers, its own vertex array and the instanced
    /// vertex array cached for it.
    pub fn remove_mesh(&mut self, mesh: MeshHandle) -> bool {
        self.instancer.evict_mesh(self.device.as_mut(), mesh);
        self.resources.remove_mesh(self.device.as_mut(), mesh).is_some()
    }

    /// Store a material
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.resources.add_material(material)
    }

    /// Resource arena
    pub fn resources(&self) -> &RenderResources {
        &self.resources
    }

    /// Mutable resource arena
    pub fn resources_mut(&mut self) -> &mut RenderResources {
        &mut self.resources
    }

    /// Built-in unit cube
    pub fn cube_mesh(&self) -> MeshHandle {
        self.cube_mesh
    }

    /// Built-in sphere of radius 0.5
    pub fn sphere_mesh(&self) -> MeshHandle {
        self.sphere_mesh
    }

    /// Material used when a draw names none
    pub fn default_material(&self) -> &Material {
        &self.default_material
    }

    /// Replace the default material of individual and instanced draws
    pub fn set_default_material(&mut self, material: Material) {
        self.instancer.set_default_material(Some(material.clone()));
        self.default_material = material;
    }

    /// Visibility culler
    pub fn culler(&self) -> &VisibilityCuller {
        &self.culler
    }

    /// Camera position captured by the last `begin_scene`
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// Graphics device
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Mutable graphics device
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// Release cached device state
    ///
    /// Instanced draws fail with [`RenderError::NotInitialized`] afterwards.
    pub fn shutdown(&mut self) {
        log::info!("Shutting down 3D renderer");
        self.instancer.shutdown(self.device.as_mut());
        self.lines.shutdown(self.device.as_mut());
        self.culler.clear_culling_data();
        self.render_queue.clear();
        self.active_frustum = None;
        self.state = SceneState::Idle;
    }
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("state", &self.state)
            .field("wireframe", &self.wireframe)
            .field("auto_instancing", &self.auto_instancing)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
