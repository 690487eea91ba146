//! Frame-level scenarios for [`FrameRenderer`] against the headless device

use approx::assert_relative_eq;
use log::Level;

use crate::core::config::{InvariantPolicy, RendererConfig};
use crate::foundation::logging::capture;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::api::PolygonMode;
use crate::render::backends::{DeviceCommand, DeviceFailures, HeadlessDevice};
use crate::render::primitives::{Camera3D, Camera3DController, ControlMode, Mesh};
use crate::render::resources::{Material, Model};
use crate::render::systems::FrameStatistics;
use crate::render::{FrameRenderer, RenderError, SceneState};
use crate::scene::ModelRendererComponent;

fn red() -> Vec4 {
    Vec4::new(1.0, 0.0, 0.0, 1.0)
}

fn config() -> RendererConfig {
    RendererConfig::new().with_invariant_policy(InvariantPolicy::Log)
}

fn renderer_with(config: RendererConfig) -> FrameRenderer {
    FrameRenderer::new(Box::new(HeadlessDevice::new()), config).unwrap()
}

fn renderer() -> FrameRenderer {
    renderer_with(config())
}

fn headless(renderer: &FrameRenderer) -> &HeadlessDevice {
    renderer.device().as_any().downcast_ref::<HeadlessDevice>().unwrap()
}

fn headless_mut(renderer: &mut FrameRenderer) -> &mut HeadlessDevice {
    renderer.device_mut().as_any_mut().downcast_mut::<HeadlessDevice>().unwrap()
}

/// Looks down -Z from z = 10 with far = 100
fn camera() -> Camera3D {
    let mut camera = Camera3D::new(60.0, 1.0, 0.1, 100.0);
    camera.set_position(Vec3::new(0.0, 0.0, 10.0));
    camera
}

fn beyond_far() -> Mat4 {
    // Ten times the far distance in front of the camera
    Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0 - 1000.0))
}

fn count_commands(renderer: &FrameRenderer, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
    headless(renderer).commands().iter().filter(|c| predicate(c)).count()
}

#[test]
fn test_frame_counts_visible_and_culled() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());

    for id in 0..10 {
        renderer.draw_cube(&Mat4::identity(), red(), id);
    }
    for id in 10..15 {
        renderer.draw_cube(&beyond_far(), red(), id);
    }
    renderer.end_scene();

    let stats = renderer.stats();
    assert_eq!(stats.mesh_count, 15);
    assert_eq!(stats.visible_mesh_count, 10);
    assert_eq!(stats.culled_mesh_count, 5);
    assert_eq!(stats.draw_calls, 10);
    assert_eq!(stats.individual_draw_calls, 10);
    assert_eq!(stats.individual_objects, 10);
    assert_eq!(stats.index_count, 360);
    assert_relative_eq!(stats.culling_efficiency(), 100.0 / 3.0, epsilon = 1e-4);
    assert_relative_eq!(renderer.culling_efficiency(), 100.0 / 3.0, epsilon = 1e-4);
    assert_eq!(renderer.total_mesh_count(), 15);
    assert_eq!(renderer.culled_mesh_count(), 5);
}

#[test]
fn test_counters_restart_each_scene() {
    let mut renderer = renderer();
    for _ in 0..2 {
        renderer.begin_scene(&camera());
        renderer.draw_cube(&Mat4::identity(), red(), 0);
        renderer.end_scene();
    }

    assert_eq!(renderer.stats().mesh_count, 1);
    assert_eq!(renderer.stats().draw_calls, 2);
}

#[test]
fn test_visibility_round_trip_across_frames() {
    let mut renderer = renderer();
    let near = Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));

    for (transform, expected) in [(near, true), (beyond_far(), false), (near, true)] {
        renderer.begin_scene(&camera());
        renderer.draw_cube(&transform, red(), 7);
        renderer.end_scene();

        assert_eq!(renderer.culler().record(7).unwrap().was_visible, expected);
        assert_eq!(renderer.stats().visible_mesh_count, expected as u32);
    }
}

#[test]
fn test_begin_scene_uploads_uniforms_and_captures_camera() {
    let mut renderer = renderer();
    headless_mut(&mut renderer).clear_commands();

    renderer.begin_scene(&camera());

    let sizes: Vec<usize> = headless(&renderer)
        .commands()
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::UploadUniformData { bytes, .. } => Some(*bytes),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![80, 32]);
    assert_eq!(renderer.camera_position(), Vec3::new(0.0, 0.0, 10.0));
    assert_eq!(renderer.scene_state(), SceneState::SceneActive);
}

#[test]
fn test_controller_scene_uses_its_camera() {
    let mut renderer = renderer();
    let controller = Camera3DController::new(1.0, ControlMode::Fly);

    renderer.begin_scene_with_controller(&controller);
    assert_eq!(renderer.camera_position(), controller.camera().position());
    renderer.end_scene();
}

#[test]
fn test_usage_errors_are_noops_under_log_policy() {
    let mut renderer = renderer();
    headless_mut(&mut renderer).clear_commands();

    renderer.draw_cube(&Mat4::identity(), red(), 0);
    renderer.draw_line_3d(Vec3::zeros(), Vec3::x(), red(), 0);
    renderer.end_scene();
    assert!(matches!(
        renderer.draw_instanced(&[Mat4::identity()], renderer.cube_mesh(), &[red()], &[0]),
        Err(RenderError::InvalidState(_))
    ));
    assert_eq!(headless(&renderer).draw_call_count(), 0);
    assert_eq!(renderer.stats(), FrameStatistics::default());

    renderer.begin_scene(&camera());
    renderer.draw_cube(&Mat4::identity(), red(), 0);
    // Nested begin keeps the current scene
    renderer.begin_scene(&camera());
    renderer.end_scene();

    assert_eq!(renderer.stats().mesh_count, 1);
    assert_eq!(renderer.scene_state(), SceneState::Idle);
}

#[test]
#[should_panic]
fn test_draw_outside_scene_panics_under_panic_policy() {
    let mut renderer = renderer_with(config().with_invariant_policy(InvariantPolicy::Panic));
    renderer.draw_cube(&Mat4::identity(), red(), 0);
}

#[test]
#[should_panic]
fn test_nested_begin_scene_panics_under_panic_policy() {
    let mut renderer = renderer_with(config().with_invariant_policy(InvariantPolicy::Panic));
    renderer.begin_scene(&camera());
    renderer.begin_scene(&camera());
}

#[test]
fn test_negative_entity_id_is_drawn_uncounted() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());
    renderer.draw_cube(&beyond_far(), red(), -1);
    renderer.end_scene();

    assert_eq!(renderer.stats().mesh_count, 0);
    assert_eq!(renderer.stats().individual_objects, 1);
}

#[test]
fn test_visibility_queries_fail_open_outside_scene() {
    let mut renderer = renderer();
    let far_point = Vec3::new(0.0, 0.0, -5000.0);

    assert!(renderer.is_point_visible(&far_point));
    assert!(renderer.is_sphere_visible(&far_point, 1.0));
    assert!(renderer.is_aabb_visible(&far_point, &(far_point + Vec3::repeat(1.0))));

    renderer.begin_scene(&camera());
    assert!(!renderer.is_point_visible(&far_point));
    assert!(renderer.is_point_visible(&Vec3::zeros()));
    assert!(!renderer.is_entity_visible(0, &Mat4::new_translation(&far_point), 1.0));
    assert!(renderer.is_entity_visible(0, &Mat4::identity(), 1.0));
    renderer.end_scene();
}

#[test]
fn test_instanced_draw_stats() {
    let mut renderer = renderer();
    let transforms = vec![Mat4::identity(); 20];
    let colors = vec![red(); 20];
    let ids: Vec<i32> = (0..20).collect();

    renderer.begin_scene(&camera());
    headless_mut(&mut renderer).clear_commands();
    let drawn = renderer.draw_instanced(&transforms, renderer.cube_mesh(), &colors, &ids).unwrap();
    renderer.end_scene();

    assert_eq!(drawn, 20);
    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.instanced_draw_calls, 1);
    assert_eq!(stats.total_instances, 20);
    assert_eq!(stats.instanced_objects, 20);
    assert_eq!(stats.index_count, 36 * 20);
    assert_eq!(stats.mesh_count, 20);
    assert_relative_eq!(renderer.instancing_efficiency(), 100.0);
    assert_eq!(
        count_commands(&renderer, |c| matches!(c, DeviceCommand::DrawInstanced { instance_count: 20, .. })),
        1
    );
}

#[test]
fn test_dense_instanced_mesh_counts_without_overflow() {
    let mut renderer = renderer();
    let dense = Mesh::sphere(0.5, 400, 400);
    let dense_indices = u64::from(dense.index_count());
    let dense_vertices = u64::from(dense.vertex_count());
    let handle = renderer.upload_mesh(&dense).unwrap();

    let transforms = vec![Mat4::identity(); 5000];
    let colors = vec![red(); 5000];
    let ids: Vec<i32> = (0..5000).collect();

    renderer.begin_scene(&camera());
    let drawn = renderer.draw_instanced(&transforms, handle, &colors, &ids).unwrap();
    renderer.end_scene();

    assert_eq!(drawn, 5000);
    let stats = renderer.stats();
    assert!(dense_indices * 5000 > u64::from(u32::MAX));
    assert_eq!(stats.index_count, dense_indices * 5000);
    assert_eq!(stats.vertex_count, dense_vertices * 5000);
    assert_eq!(stats.total_instances, 5000);
}

#[test]
fn test_instancing_cap() {
    let mut renderer = renderer_with(config().with_max_instances(8));
    let transforms = vec![Mat4::identity(); 20];
    let colors = vec![red(); 20];
    let ids: Vec<i32> = (0..20).collect();

    renderer.begin_scene(&camera());
    capture::start();
    let drawn = renderer.draw_instanced(&transforms, renderer.cube_mesh(), &colors, &ids).unwrap();
    renderer.end_scene();

    assert_eq!(drawn, 8);
    let warnings = capture::messages(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("maximum instance limit"));
    assert_eq!(renderer.stats().total_instances, 8);
    assert_eq!(renderer.instanced_stats().total_instances, 20);
    assert_eq!(renderer.instanced_stats().visible_instances, 8);
}

#[test]
fn test_mismatched_instanced_arrays_draw_nothing() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());
    headless_mut(&mut renderer).clear_commands();

    let result = renderer.draw_instanced(&[Mat4::identity(); 3], renderer.cube_mesh(), &[red(); 3], &[0, 1]);
    renderer.end_scene();

    assert!(matches!(result, Err(RenderError::MismatchedSubmission { .. })));
    assert_eq!(renderer.stats(), FrameStatistics::default());
    assert_eq!(headless(&renderer).draw_call_count(), 0);
}

#[test]
fn test_lines_flush_in_one_draw() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());
    headless_mut(&mut renderer).clear_commands();

    renderer.draw_line_3d(Vec3::zeros(), Vec3::y(), red(), 1);
    renderer.draw_box(Vec3::zeros(), Vec3::repeat(2.0), red(), 2);
    renderer.draw_box_transform(&Mat4::identity(), red(), 3);
    assert_eq!(headless(&renderer).draw_call_count(), 0);
    renderer.end_scene();

    assert_eq!(
        count_commands(&renderer, |c| matches!(c, DeviceCommand::DrawLines { vertex_count: 50, .. })),
        1
    );
    assert_eq!(renderer.stats().draw_calls, 1);
    assert_eq!(renderer.stats().line_vertex_count, 50);
}

#[test]
fn test_auto_instancing_groups_by_mesh() {
    let mut renderer = renderer_with(config().with_auto_instancing(4));
    renderer.begin_scene(&camera());
    headless_mut(&mut renderer).clear_commands();

    for id in 0..6 {
        renderer.draw_cube(&Mat4::identity(), red(), id);
    }
    renderer.draw_sphere_at(Vec3::zeros(), 1.0, red(), 6);
    renderer.draw_sphere_at(Vec3::new(0.0, 0.0, -990.0), 1.0, red(), 7);
    assert_eq!(headless(&renderer).draw_call_count(), 0);
    renderer.end_scene();

    let stats = renderer.stats();
    assert_eq!(stats.mesh_count, 8);
    assert_eq!(stats.culled_mesh_count, 1);
    assert_eq!(stats.instanced_draw_calls, 1);
    assert_eq!(stats.instanced_objects, 6);
    assert_eq!(stats.individual_draw_calls, 1);
    assert_eq!(stats.individual_objects, 1);
    assert_eq!(stats.draw_calls, 2);
    assert_relative_eq!(stats.instancing_efficiency(), 600.0 / 7.0, epsilon = 1e-4);
}

#[test]
fn test_auto_instancing_can_be_toggled() {
    let mut renderer = renderer();
    assert!(!renderer.is_auto_instancing_enabled());

    renderer.enable_auto_instancing(true);
    renderer.set_instancing_threshold(2);
    renderer.begin_scene(&camera());
    renderer.draw_cube(&Mat4::identity(), red(), 0);
    renderer.draw_cube(&Mat4::identity(), red(), 1);
    renderer.end_scene();

    assert_eq!(renderer.instancing_threshold(), 2);
    assert_eq!(renderer.stats().instanced_draw_calls, 1);
}

#[test]
fn test_wireframe_switches_shader_state() {
    let mut renderer = renderer();
    renderer.enable_wireframe(true);
    assert!(renderer.is_wireframe_enabled());

    renderer.begin_scene(&camera());
    headless_mut(&mut renderer).clear_commands();
    renderer.draw_cube(&Mat4::identity(), red(), 0);
    renderer.end_scene();

    assert_eq!(
        count_commands(&renderer, |c| matches!(c, DeviceCommand::SetPolygonMode(PolygonMode::Line))),
        1
    );
    assert_eq!(
        count_commands(&renderer, |c| matches!(c, DeviceCommand::SetUniform { name, .. } if name == "u_Color")),
        1
    );
    assert_eq!(count_commands(&renderer, |c| matches!(c, DeviceCommand::BindTexture { .. })), 4);
}

#[test]
fn test_draw_model_resolves_materials() {
    let mut renderer = renderer();
    let cube = renderer.cube_mesh();
    let sphere = renderer.sphere_mesh();
    let blue = renderer.add_material(Material::from_color(Vec4::new(0.0, 0.0, 1.0, 1.0)));
    renderer.resources_mut().set_mesh_material(sphere, Some(blue)).unwrap();

    let empty = ModelRendererComponent::default();
    let model = ModelRendererComponent::new(Model::new(vec![cube, sphere]));

    renderer.begin_scene(&camera());
    renderer.draw_model(&Mat4::identity(), &empty, 0);
    renderer.draw_model(&Mat4::identity(), &model, 1);
    renderer.end_scene();

    assert_eq!(renderer.stats().individual_objects, 2);
    assert_eq!(renderer.stats().draw_calls, 2);
}

#[test]
fn test_unknown_mesh_and_material_are_skipped() {
    let mut renderer = renderer();
    let extra = renderer.upload_mesh(&Mesh::cube(2.0)).unwrap();
    assert!(renderer.remove_mesh(extra));
    let material = renderer.add_material(Material::default());
    renderer.resources_mut().remove_material(material);

    renderer.begin_scene(&camera());
    renderer.draw_mesh(&Mat4::identity(), extra, red(), 0);
    renderer.draw_mesh_with_material(&Mat4::identity(), renderer.cube_mesh(), Some(material), 1);
    renderer.end_scene();

    assert_eq!(renderer.stats().draw_calls, 0);
    assert_eq!(renderer.stats().individual_objects, 0);
}

#[test]
fn test_remove_mesh_releases_device_resources() {
    let mut renderer = renderer();
    let extra = renderer.upload_mesh(&Mesh::cube(2.0)).unwrap();
    let gpu_mesh = renderer.resources().mesh(extra).unwrap().clone();

    renderer.begin_scene(&camera());
    renderer.draw_instanced(&[Mat4::identity()], extra, &[red()], &[0]).unwrap();
    renderer.end_scene();
    assert!(renderer.instanced_vertex_arrays().contains(extra));
    let buffers_before = headless(&renderer).buffer_count();
    let vertex_arrays_before = headless(&renderer).vertex_array_count();

    assert!(renderer.remove_mesh(extra));

    let device = headless(&renderer);
    assert_eq!(device.buffer_size(gpu_mesh.vertex_buffer), None);
    assert_eq!(device.buffer_size(gpu_mesh.index_buffer), None);
    assert!(!device.has_vertex_array(gpu_mesh.vertex_array));
    assert_eq!(device.buffer_count(), buffers_before - 2);
    // The mesh's own vertex array and its instanced one
    assert_eq!(device.vertex_array_count(), vertex_arrays_before - 2);
    assert!(!renderer.instanced_vertex_arrays().contains(extra));
    assert_eq!(renderer.instanced_stats().cached_vaos, 0);
    assert!(!renderer.remove_mesh(extra));
}

#[test]
fn test_reset_stats_keeps_last_frame() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());
    renderer.draw_cube_at(Vec3::zeros(), Vec3::repeat(1.0), red(), 0);
    renderer.end_scene();

    let frame = renderer.stats();
    renderer.reset_stats();

    assert_eq!(renderer.last_frame_stats(), frame);
    assert_eq!(renderer.stats(), FrameStatistics::default());
}

#[test]
fn test_lighting_applies_at_next_scene() {
    let mut renderer = renderer();
    renderer.set_point_light_position(Vec3::new(4.0, 5.0, 6.0));
    renderer.set_ambient_light(Vec3::new(0.2, 0.2, 0.2), 0.5);

    assert_eq!(renderer.lighting().point_light_position, Vec3::new(4.0, 5.0, 6.0));
    assert_relative_eq!(renderer.lighting().ambient_intensity, 0.5);
}

#[test]
fn test_cache_maintenance_and_shutdown() {
    let mut renderer = renderer();
    renderer.begin_scene(&camera());
    renderer.draw_instanced(&[Mat4::identity()], renderer.cube_mesh(), &[red()], &[3]).unwrap();
    renderer.end_scene();
    assert_eq!(renderer.instanced_stats().cached_vaos, 1);

    renderer.clear_instance_cache();
    assert_eq!(renderer.instanced_stats().cached_vaos, 0);

    renderer.invalidate_entity_bounds(3);
    assert_eq!(renderer.culler().record(3).unwrap().bounding_radius, 0.0);
    renderer.clear_culling_data();
    assert!(renderer.culler().record(3).is_none());

    renderer.shutdown();
    renderer.begin_scene(&camera());
    let result = renderer.draw_instanced(&[Mat4::identity()], renderer.cube_mesh(), &[red()], &[3]);
    assert!(matches!(result, Err(RenderError::NotInitialized(_))));
}

#[test]
fn test_construction_fails_on_device_errors() {
    let device = HeadlessDevice::with_failures(DeviceFailures::SHADER_CREATION);
    let result = FrameRenderer::new(Box::new(device), config());
    assert!(matches!(result, Err(RenderError::ShaderCreationFailed(_))));

    let invalid = config().with_max_instances(0);
    let result = FrameRenderer::new(Box::new(HeadlessDevice::new()), invalid);
    assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
}
