//! Fly camera driven by yaw/pitch Euler angles (right-handed, degrees).
//!
//! The basis vectors `front`, `right` and `up` are never assigned directly:
//! every change to yaw or pitch goes through [`Camera::update_basis`], which
//! rebuilds them from the angles and the constant world-up vector.

use crate::{Mat4, Transform, Vec3};

/// Field-of-view change per zoom step, in degrees.
pub const ZOOM_STEP_DEG: f32 = 1.0;
/// Pitch is clamped to this magnitude to keep `front` away from `world_up`.
pub const PITCH_LIMIT_DEG: f32 = 89.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// Discrete movement request coming from the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Distance travelled per [`Camera::apply_move`] call.
    pub speed: f32,
    /// Degrees per unit of look input.
    pub sensitivity: f32,
    /// Vertical field of view in degrees. Not clamped here.
    pub fov: f32,

    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            speed: 0.5,
            sensitivity: 0.1,
            fov: 45.0,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, speed: f32, sensitivity: f32, fov: f32) -> Self {
        Self {
            position,
            speed,
            sensitivity,
            fov,
            ..Self::default()
        }
    }

    #[inline]
    pub fn front(&self) -> Vec3 {
        self.front
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    #[inline]
    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    /// Yaw in degrees, in `[0, 360)` once any look input has been applied.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, always within `[-89, 89]` after a look update.
    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Rotate by a look delta (mouse motion) scaled by `sensitivity`.
    pub fn apply_look(&mut self, delta_x: f32, delta_y: f32) {
        let yaw = self.yaw + delta_x * self.sensitivity;
        let pitch = self.pitch + delta_y * self.sensitivity;
        self.set_orientation(yaw, pitch);
    }

    /// Assign yaw/pitch outright (overlay sliders). Same wrap and clamp as
    /// [`Camera::apply_look`].
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        // Floored modulo: negative yaw lands in [0, 360) as well. A tiny
        // negative remainder can round up to exactly 360.
        let yaw = yaw.rem_euclid(360.0);
        self.yaw = if yaw >= 360.0 { 0.0 } else { yaw };
        self.pitch = pitch.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        self.update_basis();
    }

    /// Positive `direction` narrows the field of view, anything else widens it.
    pub fn apply_zoom(&mut self, direction: f32) {
        if direction > 0.0 {
            self.fov -= ZOOM_STEP_DEG;
        } else {
            self.fov += ZOOM_STEP_DEG;
        }
    }

    pub fn apply_move(&mut self, direction: MoveDirection) {
        match direction {
            MoveDirection::Forward => self.position += self.front * self.speed,
            MoveDirection::Backward => self.position -= self.front * self.speed,
            MoveDirection::Right => self.position += self.right * self.speed,
            MoveDirection::Left => self.position -= self.right * self.speed,
            MoveDirection::Up => self.position += self.up * self.speed,
            MoveDirection::Down => self.position -= self.up * self.speed,
        }
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        );
        self.front = front.normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection with wgpu's `[0, 1]` depth range. A zero
    /// height is the caller's problem; the aspect is only guarded against
    /// producing NaN.
    #[inline]
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(1e-6), Z_NEAR, Z_FAR)
    }

    /// Per-instance placement. Identity for now.
    #[inline]
    pub fn model_matrix(&self) -> Mat4 {
        Transform::identity().matrix()
    }
}
