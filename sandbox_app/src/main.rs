//! Sandbox demo application
//!
//! Drives the render core headlessly: a field of randomly placed cubes and
//! spheres, a flying camera, a few frames, and the statistics of each frame.
//!
//! Usage: `sandbox [config.toml|config.ron]`

use pro_engine::foundation::logging;
use pro_engine::prelude::*;
use rand::Rng;
use thiserror::Error;

/// Entities per primitive kind in the demo field
const FIELD_SIZE: i32 = 500;

/// Half extent of the cube the field is scattered in
const FIELD_EXTENT: f32 = 200.0;

/// Seconds simulated per frame
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Upper bound on device calls kept in the headless command log
const COMMAND_LOG_LIMIT: usize = 16_384;

#[derive(Error, Debug)]
enum SandboxError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),
}

struct FieldObject {
    transform: Mat4,
    color: Vec4,
    entity_id: i32,
}

struct SandboxApp {
    renderer: FrameRenderer,
    controller: Camera3DController,
    cubes: Vec<FieldObject>,
    spheres: Vec<FieldObject>,
    frame_count: u32,
}

impl SandboxApp {
    fn new(config: &ApplicationConfig) -> Result<Self, SandboxError> {
        log::info!("Creating sandbox application...");
        let device = HeadlessDevice::new().with_command_limit(COMMAND_LOG_LIMIT);
        let renderer = FrameRenderer::new(Box::new(device), config.renderer.clone())?;
        let controller = Camera3DController::from_config(&config.camera, 16.0 / 9.0, ControlMode::Fly);

        let mut rng = rand::thread_rng();
        let mut scatter = |first_id: i32| -> Vec<FieldObject> {
            (0..FIELD_SIZE)
                .map(|i| {
                    let position = Vec3::new(
                        rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
                        rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
                        rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
                    );
                    let scale = rng.gen_range(0.5..3.0);
                    FieldObject {
                        transform: Mat4::new_translation(&position) * Mat4::new_scaling(scale),
                        color: Vec4::new(rng.gen(), rng.gen(), rng.gen(), 1.0),
                        entity_id: first_id + i,
                    }
                })
                .collect()
        };
        let cubes = scatter(0);
        let spheres = scatter(FIELD_SIZE);
        log::info!("Scattered {} cubes and {} spheres", cubes.len(), spheres.len());

        Ok(Self {
            renderer,
            controller,
            cubes,
            spheres,
            frame_count: config.engine.frame_count,
        })
    }

    fn render_frame(&mut self, frame: u32) -> Result<(), SandboxError> {
        self.renderer.reset_stats();
        self.renderer.begin_scene_with_controller(&self.controller);

        // Cubes go through one explicit instanced draw
        let transforms: Vec<Mat4> = self.cubes.iter().map(|o| o.transform).collect();
        let colors: Vec<Vec4> = self.cubes.iter().map(|o| o.color).collect();
        let entity_ids: Vec<i32> = self.cubes.iter().map(|o| o.entity_id).collect();
        self.renderer
            .draw_instanced(&transforms, self.renderer.cube_mesh(), &colors, &entity_ids)?;

        // Spheres are drawn one by one, or grouped when auto-instancing is on
        for sphere in &self.spheres {
            self.renderer.draw_sphere(&sphere.transform, sphere.color, sphere.entity_id);
        }

        self.renderer.draw_box(Vec3::zeros(), Vec3::repeat(FIELD_EXTENT * 2.0), Vec4::new(1.0, 1.0, 0.0, 1.0), -1);
        self.renderer.end_scene();

        let stats = self.renderer.stats();
        log::info!(
            "Frame {}: {} draw calls, {}/{} visible ({:.1}% culled), {} instanced, {} individual, {} line vertices",
            frame,
            stats.draw_calls,
            stats.visible_mesh_count,
            stats.mesh_count,
            stats.culling_efficiency(),
            stats.instanced_objects,
            stats.individual_objects,
            stats.line_vertex_count,
        );

        if let Some(device) = self.renderer.device_mut().as_any_mut().downcast_mut::<HeadlessDevice>() {
            log::debug!("Frame {}: {} device calls recorded", frame, device.commands().len());
            device.clear_commands();
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), SandboxError> {
        // Fly forward and turn a little every frame
        self.controller.set_key_state(CameraKey::Forward, true);
        for frame in 0..self.frame_count {
            self.controller.on_mouse_moved(frame as f32 * 20.0, 0.0);
            self.controller.update(FRAME_TIME * 30.0);
            self.render_frame(frame)?;
        }

        let instanced = self.renderer.instanced_stats();
        log::info!(
            "Instancing: {} buffer updates, {} cached vertex arrays",
            instanced.buffer_updates, instanced.cached_vaos
        );
        self.renderer.shutdown();
        Ok(())
    }
}

fn load_config() -> Result<ApplicationConfig, SandboxError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(&path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.engine.log_level);

    let mut app = SandboxApp::new(&config)?;
    app.run()?;

    log::info!("Sandbox finished");
    Ok(())
}
