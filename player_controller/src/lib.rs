//! Player composition: intent resolution, motor, capsule, animation, camera.
#![forbid(unsafe_code)]

pub mod input;
pub mod visual;

use character_animation::{AnimationBlender, TrackDeck};
use character_motor::{gravity_vector, InputIntent, MotionMotor, MotionState};
use character_profiles::{CharacterProfile, ProfileError, ProfileSet};
use engine_core::logging;
use follow_camera::FollowCamera;
use input::{IntentResolver, RawInput};
use physics_rapier::{CapsuleBody, PhysicsWorld};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use visual::VisualSync;

const MOVING_THRESHOLD: Real = 0.1;

/// Derived per-tick snapshot for HUD/UI readers. Never a handle into the
/// core's mutable state.
#[derive(Clone, Copy, Debug)]
pub struct PlayerFrame {
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
    pub yaw: Real,
    pub state: MotionState,
    pub moving: bool,
    pub camera_position: Vector<Real>,
}

pub struct PlayerController<R: IntentResolver> {
    resolver: R,
    motor: MotionMotor,
    body: CapsuleBody,
    blender: AnimationBlender,
    camera: FollowCamera,
    visual: VisualSync,
    profile: Option<CharacterProfile>,
    yaw: Real,
    target_yaw: Real,
    physics_paused: bool,
    last_intent: InputIntent,
}

impl<R: IntentResolver> PlayerController<R> {
    pub fn new(resolver: R, camera: FollowCamera, spawn: Vector<Real>) -> Self {
        Self {
            resolver,
            motor: MotionMotor::new(),
            body: CapsuleBody::new(1.8, 0.6, spawn),
            blender: AnimationBlender::new(),
            camera,
            visual: VisualSync::new(),
            profile: None,
            yaw: 0.0,
            target_yaw: 0.0,
            physics_paused: false,
            last_intent: InputIntent::default(),
        }
    }

    /// Swaps the active character: one atomic reset of velocity, motion
    /// state, animation, camera override state, and input latches.
    pub fn set_profile(&mut self, profile: CharacterProfile, spawn: Vector<Real>) {
        self.body
            .set_capsule(profile.capsule_height, profile.capsule_radius);
        self.body.set_position(spawn);
        self.body.set_velocity(Vector::zeros());
        self.motor.reset();
        self.blender.set_profile(&profile);
        self.camera.force_follow();
        self.visual.set_mesh_scale(profile.mesh_scale);
        self.yaw = 0.0;
        self.target_yaw = 0.0;
        self.last_intent = InputIntent::default();
        self.profile = Some(profile);
    }

    /// Looks the character up by name; an unknown name mutates nothing.
    pub fn set_profile_by_name(
        &mut self,
        roster: &ProfileSet,
        name: &str,
        spawn: Vector<Real>,
    ) -> Result<(), ProfileError> {
        let profile = roster.find(name)?.clone();
        self.set_profile(profile, spawn);
        Ok(())
    }

    /// Environment swap: move to the new spawn point with velocity zeroed.
    pub fn relocate(&mut self, spawn: Vector<Real>) {
        self.body.set_position(spawn);
        self.body.set_velocity(Vector::zeros());
    }

    /// Suspends the probe/synthesis/integration steps. Gravity is never
    /// applied while paused; presentation keeps running.
    pub fn pause_physics(&mut self) {
        self.physics_paused = true;
        self.body.set_velocity(Vector::zeros());
    }

    pub fn resume_physics(&mut self) {
        self.physics_paused = false;
    }

    pub fn is_physics_paused(&self) -> bool {
        self.physics_paused
    }

    pub fn position(&self) -> Vector<Real> {
        self.body.position()
    }

    pub fn velocity(&self) -> Vector<Real> {
        self.body.velocity()
    }

    pub fn yaw(&self) -> Real {
        self.yaw
    }

    pub fn state(&self) -> MotionState {
        self.motor.state()
    }

    pub fn is_on_ground(&self) -> bool {
        self.motor.state() == MotionState::OnGround
    }

    pub fn is_boosting(&self) -> bool {
        self.last_intent.want_boost
    }

    /// Moving means raw movement or turn input past the deadzone, not the
    /// resulting velocity.
    pub fn is_moving(&self) -> bool {
        self.last_intent.movement_magnitude() > MOVING_THRESHOLD
            || self.last_intent.turn_axis.abs() > MOVING_THRESHOLD
    }

    pub fn profile(&self) -> Option<&CharacterProfile> {
        self.profile.as_ref()
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FollowCamera {
        &mut self.camera
    }

    pub fn set_camera_offset(&mut self, offset: Vector<Real>) {
        self.camera.set_offset(offset);
    }

    pub fn reset_camera_offset(&mut self) {
        self.camera.reset_offset();
    }

    pub fn animation(&self) -> &AnimationBlender {
        &self.blender
    }

    pub fn visual(&self) -> &VisualSync {
        &self.visual
    }

    /// One frame of the update path, in order: resolve intent, probe
    /// support, advance the state machine and synthesize velocity,
    /// integrate, sync visuals, animate, update the camera. `now` is the
    /// single captured monotonic time for every timer this tick.
    pub fn tick(
        &mut self,
        world: &PhysicsWorld,
        deck: &mut dyn TrackDeck,
        primary: RawInput,
        secondary: Option<RawInput>,
        dt: Real,
        now: f64,
    ) -> PlayerFrame {
        let intent = self.resolver.resolve(primary, secondary);
        self.last_intent = intent;
        let moving = self.is_moving();

        if !self.physics_paused {
            if let Some(profile) = self.profile.as_ref() {
                let gravity = gravity_vector(profile);
                let down = if gravity.norm_squared() > Real::EPSILON {
                    gravity.normalize()
                } else {
                    -Vector::y()
                };
                let support = self.body.check_support(world, dt, down);
                let output = self.motor.step(
                    intent,
                    support,
                    profile,
                    self.yaw,
                    self.body.velocity(),
                    dt,
                );
                self.body.set_velocity(output.next_velocity);
                self.body.integrate(world, dt, support, gravity);
            } else {
                logging::warn("no character profile active; holding velocity this tick");
            }
        }

        self.update_yaw(intent);
        self.visual.sync(self.body.position(), self.yaw);

        if let Some(profile) = self.profile.as_ref() {
            self.blender
                .update(deck, moving, self.motor.state(), &profile.tracks, now);
            self.blender.update_blend(deck, now);
        }

        if let Some(yaw) = self.camera.update(self.body.position(), self.yaw, moving, now) {
            self.yaw = yaw;
            self.target_yaw = yaw;
        }

        PlayerFrame {
            position: self.body.position(),
            velocity: self.body.velocity(),
            yaw: self.yaw,
            state: self.motor.state(),
            moving,
            camera_position: self.camera.position(),
        }
    }

    fn update_yaw(&mut self, intent: InputIntent) {
        // The camera's rotation animation owns yaw; track it to avoid a
        // jerk when it hands control back.
        if self.camera.is_rotating_character() {
            self.target_yaw = self.yaw;
            return;
        }
        // No rotation from input while airborne.
        if self.motor.state() == MotionState::InAir {
            return;
        }
        let Some(profile) = self.profile.as_ref() else {
            return;
        };
        self.target_yaw += intent.turn_axis * profile.rotation_speed;
        self.yaw += (self.target_yaw - self.yaw) * profile.rotation_smoothing;
    }
}
