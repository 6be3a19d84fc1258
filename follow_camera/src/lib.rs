//! Lagged third-person chase camera with drag override and a decoupled
//! character-facing rotation animation.
#![forbid(unsafe_code)]

use engine_core::timing::{ease_in_out_cubic, TimedWindow};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

const WHEEL_ZOOM_SCALE: Real = 6.0;

#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub start_position: [Real; 3],
    /// Local offset from the target, pre-rotation. Negative depth is behind.
    pub offset: [Real; 3],
    pub drag_sensitivity: Real,
    pub zoom_min: Real,
    pub zoom_max: Real,
    /// Smoothing factor at the far end of the zoom range.
    pub smoothing_far: Real,
    /// Smoothing factor at the near end of the zoom range.
    pub smoothing_near: Real,
    /// Character-facing rotation ease length in seconds.
    pub rotation_duration: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_position: [0.0, 5.0, -10.0],
            offset: [0.0, 1.2, -3.0],
            drag_sensitivity: 0.02,
            zoom_min: -15.0,
            zoom_max: -2.0,
            smoothing_far: 0.05,
            smoothing_near: 0.25,
            rotation_duration: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMode {
    IdleFollow,
    Dragging,
    RotatingCharacter,
}

#[derive(Clone, Copy, Debug)]
struct RotationAnim {
    start_yaw: Real,
    target_yaw: Real,
    window: TimedWindow,
}

pub struct FollowCamera {
    config: CameraConfig,
    offset: Vector<Real>,
    position: Vector<Real>,
    dragging: bool,
    /// Pointer deltas accumulated since the last tick, pre-scaled by the
    /// drag sensitivity. Applied and cleared in `update` while dragging.
    drag_delta: [Real; 2],
    /// Set when a drag ends; the rotation animation fires on the first
    /// frame movement resumes, and smooth-follow holds until then.
    rotation_armed: bool,
    rotation: Option<RotationAnim>,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl FollowCamera {
    pub fn new(config: CameraConfig) -> Self {
        let [ox, oy, oz] = config.offset;
        let [px, py, pz] = config.start_position;
        let mut camera = Self {
            config,
            offset: Vector::new(ox, oy, oz),
            position: Vector::new(px, py, pz),
            dragging: false,
            drag_delta: [0.0, 0.0],
            rotation_armed: false,
            rotation: None,
        };
        camera.clamp_zoom();
        camera
    }

    pub fn position(&self) -> Vector<Real> {
        self.position
    }

    pub fn offset(&self) -> Vector<Real> {
        self.offset
    }

    pub fn mode(&self) -> CameraMode {
        if self.dragging {
            CameraMode::Dragging
        } else if self.rotation.is_some() {
            CameraMode::RotatingCharacter
        } else {
            CameraMode::IdleFollow
        }
    }

    pub fn is_rotating_character(&self) -> bool {
        self.rotation.is_some()
    }

    pub fn pointer_down(&mut self) {
        self.dragging = true;
        self.drag_delta = [0.0, 0.0];
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.drag_delta = [0.0, 0.0];
        self.rotation_armed = true;
    }

    /// Accumulates pointer drag deltas; the next `update` applies them
    /// along the camera's own right/up basis.
    pub fn drag_move(&mut self, delta_x: Real, delta_y: Real) {
        if !self.dragging {
            return;
        }
        let sensitivity = self.config.drag_sensitivity;
        self.drag_delta[0] += -delta_x * sensitivity;
        self.drag_delta[1] += delta_y * sensitivity;
    }

    /// Wheel/pinch zoom along the offset's depth axis, always clamped.
    pub fn zoom(&mut self, delta: Real) {
        self.offset.z += delta * self.config.drag_sensitivity * WHEEL_ZOOM_SCALE;
        self.clamp_zoom();
    }

    pub fn set_offset(&mut self, offset: Vector<Real>) {
        self.offset = offset;
        self.clamp_zoom();
    }

    /// Restores the configured offset and forces smooth-follow back on.
    pub fn reset_offset(&mut self) {
        let [ox, oy, oz] = self.config.offset;
        self.offset = Vector::new(ox, oy, oz);
        self.clamp_zoom();
        self.force_follow();
    }

    /// Clears drag/armed/rotation state, e.g. after environment swaps.
    pub fn force_follow(&mut self) {
        self.dragging = false;
        self.drag_delta = [0.0, 0.0];
        self.rotation_armed = false;
        self.rotation = None;
    }

    fn clamp_zoom(&mut self) {
        self.offset.z = self
            .offset
            .z
            .clamp(self.config.zoom_min, self.config.zoom_max);
    }

    /// Per-tick camera update. Returns the yaw the character must adopt
    /// while the rotation animation owns it, `None` otherwise.
    pub fn update(
        &mut self,
        target: Vector<Real>,
        target_yaw: Real,
        moving: bool,
        now: f64,
    ) -> Option<Real> {
        if moving && self.rotation_armed && !self.dragging {
            self.rotation_armed = false;
            self.start_rotation(target, target_yaw, now);
        }

        if self.dragging {
            self.apply_drag(target);
            // Keep the vertical offset live so releasing does not snap.
            self.offset.y = self.position.y - target.y;
        } else if !self.rotation_armed && self.rotation.is_none() {
            self.smooth_follow(target, target_yaw);
        }

        self.advance_rotation(now)
    }

    fn apply_drag(&mut self, target: Vector<Real>) {
        let [dx, dy] = self.drag_delta;
        self.drag_delta = [0.0, 0.0];
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let look = target - self.position;
        if look.norm_squared() <= Real::EPSILON {
            return;
        }
        let look = look.normalize();
        let world_up = Vector::y();
        let right = world_up.cross(&look);
        let right = if right.norm_squared() > Real::EPSILON {
            right.normalize()
        } else {
            Vector::x()
        };
        let camera_up = look.cross(&right);
        self.position += right * dx + camera_up * dy;
    }

    fn smooth_follow(&mut self, target: Vector<Real>, target_yaw: Real) {
        let desired = target + rotate_offset_by_yaw(self.offset, target_yaw);
        let span = self.config.zoom_max - self.config.zoom_min;
        let normalized = if span.abs() > Real::EPSILON {
            ((self.offset.z - self.config.zoom_min) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        // Near cameras track tighter than far ones.
        let smoothing = self.config.smoothing_far
            + (self.config.smoothing_near - self.config.smoothing_far) * normalized;
        self.position += (desired - self.position) * smoothing;
    }

    fn start_rotation(&mut self, target: Vector<Real>, current_yaw: Real, now: f64) {
        let to_camera = self.position - target;
        if to_camera.norm_squared() <= Real::EPSILON {
            return;
        }
        // Yaw that faces the character directly away from the camera.
        let facing_yaw = (-to_camera.x).atan2(to_camera.z);
        let mut delta = facing_yaw - current_yaw;
        while delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        }
        while delta < -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }
        self.rotation = Some(RotationAnim {
            start_yaw: current_yaw,
            target_yaw: current_yaw + delta,
            window: TimedWindow::new(now, self.config.rotation_duration),
        });
    }

    fn advance_rotation(&mut self, now: f64) -> Option<Real> {
        let anim = self.rotation?;
        let progress = anim.window.progress(now);
        let eased = ease_in_out_cubic(progress) as Real;
        let yaw = anim.start_yaw + (anim.target_yaw - anim.start_yaw) * eased;
        if progress >= 1.0 {
            self.rotation = None;
        }
        Some(yaw)
    }
}

/// Places the local offset around the target: x along the character's right,
/// depth opposite the facing direction, so a negative depth sits behind.
fn rotate_offset_by_yaw(offset: Vector<Real>, yaw: Real) -> Vector<Real> {
    let right = Vector::new(yaw.cos(), 0.0, yaw.sin());
    let forward = Vector::new(yaw.sin(), 0.0, -yaw.cos());
    right * offset.x + Vector::y() * offset.y + forward * offset.z
}
