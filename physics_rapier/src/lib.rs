//! Rapier world wrapper plus the capsule support probe and integrator.
#![forbid(unsafe_code)]

use character_motor::SupportInfo;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::math::{Isometry, Point, UnitVector, Vector};
use rapier3d::prelude::*;

const STEP_HEIGHT: Real = 0.45;
const STEP_MIN_WIDTH: Real = 0.2;
const GROUND_SNAP_DISTANCE: Real = 0.2;
const CHARACTER_OFFSET: Real = 0.02;
const MAX_SLOPE_ANGLE: Real = std::f32::consts::FRAC_PI_4;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    /// Inserts a velocity-driven kinematic body (moving platforms).
    pub fn insert_kinematic_collider(
        &mut self,
        collider: Collider,
        position: Vector<Real>,
        linvel: Vector<Real>,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::kinematic_velocity_based()
            .translation(position)
            .linvel(linvel)
            .build();
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }
}

/// The simulated character capsule: support probe and rigid integrator.
///
/// Owns the kinematic position/velocity pair; both are written only from the
/// frame update path.
pub struct CapsuleBody {
    capsule: Capsule,
    capsule_radius: Real,
    capsule_height: Real,
    controller: KinematicCharacterController,
    position: Vector<Real>,
    velocity: Vector<Real>,
}

impl CapsuleBody {
    pub fn new(capsule_height: Real, capsule_radius: Real, position: Vector<Real>) -> Self {
        let mut body = Self {
            capsule: Capsule::new_y(0.5, 0.3),
            capsule_radius,
            capsule_height,
            controller: KinematicCharacterController::default(),
            position,
            velocity: Vector::zeros(),
        };
        body.set_capsule(capsule_height, capsule_radius);
        body
    }

    /// Rebuilds the capsule and controller tuning; used on profile swap.
    pub fn set_capsule(&mut self, capsule_height: Real, capsule_radius: Real) {
        self.capsule_height = capsule_height.max(0.1);
        self.capsule_radius = capsule_radius.max(0.05);
        let half_cylinder = ((self.capsule_height - 2.0 * self.capsule_radius) * 0.5).max(0.01);
        self.capsule = Capsule::new_y(half_cylinder, self.capsule_radius);
        self.controller = KinematicCharacterController {
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(STEP_HEIGHT),
                min_width: CharacterLength::Absolute(STEP_MIN_WIDTH),
                include_dynamic_bodies: false,
            }),
            snap_to_ground: Some(CharacterLength::Absolute(GROUND_SNAP_DISTANCE)),
            max_slope_climb_angle: MAX_SLOPE_ANGLE,
            offset: CharacterLength::Absolute(CHARACTER_OFFSET),
            ..Default::default()
        };
    }

    pub fn capsule_height(&self) -> Real {
        self.capsule_height
    }

    pub fn capsule_radius(&self) -> Real {
        self.capsule_radius
    }

    pub fn position(&self) -> Vector<Real> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector<Real>) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vector<Real> {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector<Real>) {
        self.velocity = velocity;
    }

    /// Probes for ground contact below the capsule foot. The cast reaches
    /// the snap distance plus however far the current fall rate would sink
    /// the capsule this frame. The result is only valid for this frame.
    pub fn check_support(&self, world: &PhysicsWorld, dt: Real, down: Vector<Real>) -> SupportInfo {
        if down.norm_squared() <= Real::EPSILON {
            return SupportInfo::airborne();
        }
        let down = down.normalize();
        let up = -down;

        // A body moving away from the surface is not supported by it.
        if self.velocity.dot(&up) > 1.0e-3 {
            return SupportInfo::airborne();
        }

        // Narrow foot probe stabilizes grounding without wall bias.
        let foot_radius = self.capsule_radius * 0.75;
        let foot_offset = -(self.capsule.half_height() + self.capsule_radius) + foot_radius;
        let foot_center = self.position + up * foot_offset;
        let ray = Ray::new(Point::from(foot_center), down);
        let fall_reach = self.velocity.dot(&down).max(0.0) * dt.max(0.0);
        let max_toi = foot_radius + GROUND_SNAP_DISTANCE + CHARACTER_OFFSET + fall_reach + 1.0e-3;

        let hit = world
            .query_pipeline()
            .cast_ray_and_get_normal(
                world.bodies(),
                world.colliders(),
                &ray,
                max_toi,
                true,
                QueryFilter::default(),
            )
            .or_else(|| {
                world.query_pipeline().cast_ray_and_get_normal(
                    world.bodies(),
                    world.colliders(),
                    &ray,
                    max_toi,
                    false,
                    QueryFilter::default(),
                )
            });
        let Some((collider_handle, intersection)) = hit else {
            return SupportInfo::airborne();
        };

        let normal = intersection.normal;
        let up_dot = normal.dot(&up);
        if up_dot <= 0.0 || up_dot < MAX_SLOPE_ANGLE.cos() {
            return SupportInfo::airborne();
        }

        let surface_velocity = world
            .colliders()
            .get(collider_handle)
            .and_then(|collider| collider.parent())
            .and_then(|body_handle| world.bodies().get(body_handle))
            .map(|body| body.velocity_at_point(&Point::from(foot_center)))
            .unwrap_or_else(Vector::zeros);

        SupportInfo {
            supported: true,
            normal,
            surface_velocity,
        }
    }

    /// Advances the capsule by the current velocity over `dt` through the
    /// rapier KCC and returns the new position. Ground snap and autostep are
    /// disabled while ascending so jumps are not glued back down.
    pub fn integrate(
        &mut self,
        world: &PhysicsWorld,
        dt: Real,
        support: SupportInfo,
        gravity: Vector<Real>,
    ) -> Vector<Real> {
        let dt = dt.max(0.0);
        if dt == 0.0 {
            return self.position;
        }
        let up_vec = if gravity.norm_squared() > Real::EPSILON {
            -gravity.normalize()
        } else {
            Vector::y()
        };
        let ascending = self.velocity.dot(&up_vec) > 0.0;

        let original_autostep = self.controller.autostep;
        let original_snap = self.controller.snap_to_ground;
        self.controller.up = UnitVector::new_normalize(up_vec);
        if ascending || !support.supported {
            self.controller.snap_to_ground = None;
            self.controller.autostep = None;
        }

        let desired_translation = self.velocity * dt;
        let position = Isometry::translation(self.position.x, self.position.y, self.position.z);
        let output = self.controller.move_shape(
            dt,
            world.bodies(),
            world.colliders(),
            world.query_pipeline(),
            &self.capsule,
            &position,
            desired_translation,
            QueryFilter::default(),
            |_| {},
        );
        self.controller.autostep = original_autostep;
        self.controller.snap_to_ground = original_snap;

        self.position += output.translation;
        self.position
    }
}
