//! Camera controller
//!
//! Drives a [`Camera3D`] from key state, mouse motion and scroll input. The
//! controller never polls a window: callers feed it input explicitly and then
//! call [`Camera3DController::update`] once per frame.

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Vec2, Vec3};
use super::camera::Camera3D;

/// Pitch limit in degrees, keeps the view from flipping over the poles
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// How the controller turns input into camera motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Free flight along the view axes
    Fly,
    /// Rotate around a focal point at a fixed distance
    Orbit,
    /// Walk on the horizontal plane, Q/E move straight up and down
    FirstPerson,
}

/// Movement keys understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraKey {
    /// W
    Forward,
    /// S
    Backward,
    /// A
    Left,
    /// D
    Right,
    /// Q
    Up,
    /// E
    Down,
}

#[derive(Debug, Clone, Copy, Default)]
struct MovementState {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

/// Input-driven owner of a [`Camera3D`]
#[derive(Debug, Clone)]
pub struct Camera3DController {
    camera: Camera3D,
    mode: ControlMode,
    movement: MovementState,

    yaw_degrees: f32,
    pitch_degrees: f32,
    last_mouse: Option<Vec2>,

    focal_point: Vec3,
    distance: f32,

    movement_speed: f32,
    mouse_sensitivity: f32,
    zoom_speed: f32,
}

impl Camera3DController {
    /// Create a controller with default camera settings
    pub fn new(aspect: f32, mode: ControlMode) -> Self {
        Self::from_config(&CameraConfig::default(), aspect, mode)
    }

    /// Create a controller from a camera configuration
    ///
    /// # Arguments
    /// * `config` - Field of view, clip range, start position and speeds
    /// * `aspect` - Viewport width / height
    /// * `mode` - Initial control mode
    pub fn from_config(config: &CameraConfig, aspect: f32, mode: ControlMode) -> Self {
        let mut camera = Camera3D::new(config.fov_degrees, aspect, config.near_clip, config.far_clip);
        camera.set_position(config.position);

        let mut controller = Self {
            camera,
            mode,
            movement: MovementState::default(),
            // -90 degrees of yaw is the default -Z forward
            yaw_degrees: -90.0,
            pitch_degrees: 0.0,
            last_mouse: None,
            focal_point: Vec3::zeros(),
            distance: config.position.norm().max(1.0),
            movement_speed: config.movement_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            zoom_speed: config.zoom_speed,
        };
        if mode == ControlMode::Orbit {
            controller.update_orbit_position();
        }
        controller
    }

    /// Controlled camera
    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    /// Mutable access to the controlled camera
    pub fn camera_mut(&mut self) -> &mut Camera3D {
        &mut self.camera
    }

    /// Active control mode
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Switch control mode
    pub fn set_mode(&mut self, mode: ControlMode) {
        self.mode = mode;
        if mode == ControlMode::Orbit {
            self.update_orbit_position();
        }
        log::debug!("Camera control mode set to {:?}", mode);
    }

    /// Current movement speed in units per second
    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    /// Set the movement speed
    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
    }

    /// Orbit distance from the focal point
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Set the orbit focal point
    pub fn set_focal_point(&mut self, focal_point: Vec3) {
        self.focal_point = focal_point;
        if self.mode == ControlMode::Orbit {
            self.update_orbit_position();
        }
    }

    /// Press or release a movement key
    pub fn set_key_state(&mut self, key: CameraKey, pressed: bool) {
        let slot = match key {
            CameraKey::Forward => &mut self.movement.forward,
            CameraKey::Backward => &mut self.movement.backward,
            CameraKey::Left => &mut self.movement.left,
            CameraKey::Right => &mut self.movement.right,
            CameraKey::Up => &mut self.movement.up,
            CameraKey::Down => &mut self.movement.down,
        };
        *slot = pressed;
    }

    /// Feed an absolute mouse position in pixels
    ///
    /// The first sample only records the position. Later samples turn the
    /// camera by `delta * mouse_sensitivity` degrees, with pitch clamped to
    /// `±89`.
    pub fn on_mouse_moved(&mut self, x: f32, y: f32) {
        let current = Vec2::new(x, y);
        let last = self.last_mouse.replace(current).unwrap_or(current);

        let x_offset = (current.x - last.x) * self.mouse_sensitivity;
        // Screen y grows downwards
        let y_offset = (last.y - current.y) * self.mouse_sensitivity;

        self.yaw_degrees += x_offset;
        self.pitch_degrees = (self.pitch_degrees + y_offset).clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);

        match self.mode {
            ControlMode::Orbit => self.update_orbit_position(),
            _ => self.camera.set_forward_direction(self.direction_from_angles()),
        }
    }

    /// Feed a scroll delta
    ///
    /// Orbit mode zooms towards the focal point, other modes change the
    /// movement speed. Both are floored at 1.0.
    pub fn on_mouse_scrolled(&mut self, y_offset: f32) {
        let amount = y_offset * self.zoom_speed;
        match self.mode {
            ControlMode::Orbit => {
                self.distance = (self.distance - amount).max(1.0);
                self.update_orbit_position();
            }
            _ => self.movement_speed = (self.movement_speed + amount).max(1.0),
        }
    }

    /// Propagate a viewport resize to the camera
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    /// Advance by `dt` seconds using the current key state
    pub fn update(&mut self, dt: f32) {
        let velocity = self.movement_speed * dt;
        let mut position = self.camera.position();

        match self.mode {
            ControlMode::Fly => {
                let forward = self.camera.forward_direction();
                let right = self.camera.right_direction();
                let up = self.camera.up_direction();
                position += self.axis_input(forward, right, up) * velocity;
            }
            ControlMode::FirstPerson => {
                let mut forward = self.camera.forward_direction();
                forward.y = 0.0;
                let forward = forward.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
                let right = self.camera.right_direction();
                position += self.axis_input(forward, right, Vec3::y()) * velocity;
            }
            ControlMode::Orbit => return,
        }

        self.camera.set_position(position);
    }

    fn axis_input(&self, forward: Vec3, right: Vec3, up: Vec3) -> Vec3 {
        let axis = |positive: bool, negative: bool| -> f32 {
            (positive as i32 - negative as i32) as f32
        };
        let m = &self.movement;
        forward * axis(m.forward, m.backward) + right * axis(m.right, m.left) + up * axis(m.up, m.down)
    }

    fn direction_from_angles(&self) -> Vec3 {
        let yaw = utils::deg_to_rad(self.yaw_degrees);
        let pitch = utils::deg_to_rad(self.pitch_degrees);
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    fn update_orbit_position(&mut self) {
        let position = self.focal_point - self.direction_from_angles() * self.distance;
        self.camera.set_position(position);
        self.camera.look_at(self.focal_point);
    }
}
