//! Locomotion state machine and mass-scaled velocity synthesis.
#![forbid(unsafe_code)]

use character_profiles::CharacterProfile;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

/// Intent magnitudes below this count as idle.
pub const IDLE_INPUT_THRESHOLD: Real = 0.1;

/// Boosted jumps target this height regardless of the profile's jump height.
const BOOSTED_JUMP_HEIGHT: Real = 10.0;

/// Up-axis velocity above this triggers the slope redirection on ground.
const SLOPE_CLIMB_EPSILON: Real = 1.0e-3;

/// Slope redirection is skipped when the surface is this close to vertical.
const DEGENERATE_NORMAL_EPSILON: Real = 1.0e-4;

/// Control responsiveness of the in-plane velocity blend, 1/s.
const STEER_RATE: Real = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MotionState {
    #[default]
    InAir,
    OnGround,
    StartJump,
}

/// Ground-contact query result. Valid for the frame it was probed in only.
#[derive(Clone, Copy, Debug)]
pub struct SupportInfo {
    pub supported: bool,
    pub normal: Vector<Real>,
    pub surface_velocity: Vector<Real>,
}

impl SupportInfo {
    pub fn airborne() -> Self {
        Self {
            supported: false,
            normal: Vector::y(),
            surface_velocity: Vector::zeros(),
        }
    }

    pub fn flat_ground() -> Self {
        Self {
            supported: true,
            normal: Vector::y(),
            surface_velocity: Vector::zeros(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InputIntent {
    /// [strafe, forward]; magnitude conventionally in [0, 1], not enforced.
    pub move_axis: [Real; 2],
    /// Rotate-left/right axis; consumed by yaw smoothing, never by velocity.
    pub turn_axis: Real,
    pub want_jump: bool,
    pub want_boost: bool,
}

impl InputIntent {
    pub fn movement_magnitude(&self) -> Real {
        let [x, z] = self.move_axis;
        (x * x + z * z).sqrt()
    }

    pub fn is_idle(&self) -> bool {
        self.movement_magnitude() < IDLE_INPUT_THRESHOLD
    }
}

/// One-tick transition. `StartJump` is an impulse state: it always advances
/// to `InAir` and is only reachable from a supported `OnGround` with jump
/// intent held.
pub fn next_state(current: MotionState, supported: bool, want_jump: bool) -> MotionState {
    match current {
        MotionState::InAir => {
            if supported {
                MotionState::OnGround
            } else {
                MotionState::InAir
            }
        }
        MotionState::OnGround => {
            if !supported {
                MotionState::InAir
            } else if want_jump {
                MotionState::StartJump
            } else {
                MotionState::OnGround
            }
        }
        MotionState::StartJump => MotionState::InAir,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MotorOutput {
    pub next_velocity: Vector<Real>,
    pub state: MotionState,
}

/// Owns the motion state and dispatches per-tick velocity synthesis.
pub struct MotionMotor {
    state: MotionState,
}

impl Default for MotionMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionMotor {
    pub fn new() -> Self {
        Self {
            state: MotionState::InAir,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Forces one support check before the character can settle.
    pub fn reset(&mut self) {
        self.state = MotionState::InAir;
    }

    pub fn step(
        &mut self,
        intent: InputIntent,
        support: SupportInfo,
        profile: &CharacterProfile,
        yaw: Real,
        current_velocity: Vector<Real>,
        dt: Real,
    ) -> MotorOutput {
        let dt = dt.max(0.0);
        self.state = next_state(self.state, support.supported, intent.want_jump);
        let next_velocity = match self.state {
            MotionState::OnGround => {
                ground_velocity(dt, current_velocity, support, intent, profile, yaw)
            }
            MotionState::InAir => air_velocity(dt, current_velocity, intent, profile, yaw),
            MotionState::StartJump => {
                jump_velocity(current_velocity, profile, intent.want_boost)
            }
        };
        MotorOutput {
            next_velocity,
            state: self.state,
        }
    }
}

pub fn gravity_vector(profile: &CharacterProfile) -> Vector<Real> {
    let [x, y, z] = profile.gravity;
    Vector::new(x, y, z)
}

pub fn up_axis(profile: &CharacterProfile) -> Vector<Real> {
    let gravity = gravity_vector(profile);
    if gravity.norm_squared() <= Real::EPSILON {
        return Vector::y();
    }
    -gravity.normalize()
}

/// Rotates the raw 2D intent into world space around the character's yaw.
/// The magnitude is preserved, not normalized.
pub fn world_move_dir(yaw: Real, move_axis: [Real; 2]) -> Vector<Real> {
    let forward = Vector::new(yaw.sin(), 0.0, -yaw.cos());
    let right = Vector::new(yaw.cos(), 0.0, yaw.sin());
    right * move_axis[0] + forward * move_axis[1]
}

/// Blends the in-plane component of `relative` toward the desired velocity,
/// keeping the component along `plane_normal` untouched.
fn steer_velocity(
    relative: Vector<Real>,
    desired: Vector<Real>,
    plane_normal: Vector<Real>,
    dt: Real,
) -> Vector<Real> {
    let alpha = (STEER_RATE * dt).clamp(0.0, 1.0);
    let normal_component = plane_normal * relative.dot(&plane_normal);
    let relative_tangent = relative - normal_component;
    let desired_tangent = desired - plane_normal * desired.dot(&plane_normal);
    normal_component + relative_tangent + (desired_tangent - relative_tangent) * alpha
}

fn mass_scaled_speed(base_speed: Real, boost_multiplier: Real, boost: bool, mass: Real) -> Real {
    let speed = if boost {
        base_speed * boost_multiplier
    } else {
        base_speed
    };
    speed / mass.max(Real::EPSILON).sqrt()
}

/// Ground branch: steer relative to the surface, then mass-scaled friction,
/// hard clamp at twice the instantaneous speed, idle damping, and the slope
/// redirection for climbing velocities.
pub fn ground_velocity(
    dt: Real,
    current: Vector<Real>,
    support: SupportInfo,
    intent: InputIntent,
    profile: &CharacterProfile,
    yaw: Real,
) -> Vector<Real> {
    let up = up_axis(profile);
    let mass = profile.mass;
    let speed = mass_scaled_speed(
        profile.ground_speed,
        profile.boost_multiplier,
        intent.want_boost,
        mass,
    );
    let desired = world_move_dir(yaw, intent.move_axis) * speed;

    let relative = current - support.surface_velocity;
    let mut velocity = steer_velocity(relative, desired, support.normal, dt);

    let friction = 0.95 + (mass - 1.0) * 0.02;
    velocity *= friction;

    let max_speed = speed * 2.0;
    let current_speed = velocity.norm();
    if current_speed > max_speed && current_speed > 0.0 {
        velocity *= max_speed / current_speed;
    }

    if intent.is_idle() {
        let damping = 0.9 + (mass - 1.0) * 0.05;
        velocity *= damping;
    }

    if velocity.dot(&up) > SLOPE_CLIMB_EPSILON {
        if let Some(redirected) = slope_redirect(velocity, support.normal, up) {
            // The surface velocity stays subtracted on this path.
            return redirected;
        }
    }

    velocity + support.surface_velocity
}

/// Flattens a climbing velocity onto its horizontal travel direction, scaled
/// by the slope so the integrator carries the full speed up the surface
/// instead of launching off it. Returns `None` when the surface is close
/// enough to vertical that the division is meaningless.
fn slope_redirect(
    velocity: Vector<Real>,
    normal: Vector<Real>,
    up: Vector<Real>,
) -> Option<Vector<Real>> {
    let normal_dot_up = normal.dot(&up);
    if normal_dot_up.abs() <= DEGENERATE_NORMAL_EPSILON {
        return None;
    }
    let speed = velocity.norm();
    if speed <= 0.0 {
        return None;
    }
    let direction = velocity / speed;
    let binormal = normal.cross(&direction);
    Some(binormal.cross(&up) * (speed / normal_dot_up))
}

/// Air branch: ballistic unless boosting, mass-scaled air resistance that
/// never decays the vertical rate, then gravity.
pub fn air_velocity(
    dt: Real,
    current: Vector<Real>,
    intent: InputIntent,
    profile: &CharacterProfile,
    yaw: Real,
) -> Vector<Real> {
    let up = up_axis(profile);
    let mass = profile.mass;

    let mut velocity = current;
    if intent.want_boost {
        let speed = mass_scaled_speed(profile.air_speed, profile.boost_multiplier, true, mass);
        let desired = world_move_dir(yaw, intent.move_axis) * speed;
        velocity = steer_velocity(current, desired, up, dt);
    }

    let resistance = 0.98 - (mass - 1.0) * 0.01;
    velocity *= resistance;

    // Restore the un-damped vertical rate before applying gravity.
    velocity -= up * velocity.dot(&up);
    velocity += up * current.dot(&up);
    velocity += gravity_vector(profile) * dt;

    velocity
}

/// Jump branch: sets the vertical rate to exactly the speed that reaches the
/// mass-scaled target height, leaving horizontal velocity untouched.
pub fn jump_velocity(
    current: Vector<Real>,
    profile: &CharacterProfile,
    boost: bool,
) -> Vector<Real> {
    let up = up_axis(profile);
    let mass = profile.mass.max(Real::EPSILON);
    let base_height = if boost {
        BOOSTED_JUMP_HEIGHT
    } else {
        profile.jump_height
    };
    let height = base_height / mass.sqrt();
    let u = (2.0 * profile.gravity_magnitude() * height.max(0.0)).sqrt();
    let vertical = current.dot(&up);
    current + up * (u - vertical)
}
