//! The kart entity and its per-step movement pipeline.

use crate::{
    collision::{
        CapsuleSpec, ColliderId, CollisionQuery, KartId, QueryFilter, Quat, Transform, Vec3,
    },
    config::KartConfig,
    drift::{Drift, DriftSettings, DriftState, Landing},
    error::KartResult,
    events::KartEvent,
    ground::{GroundInfo, GroundSampler},
    input::KartInput,
    integrator::{
        Drive, Steer, adjust_velocity_by_penetration, align_to_ground, driving_velocity,
        hop_impulse, local_velocity, steer,
    },
    layers::{colliding_layers, ground_layers},
    math::rotate_towards,
    penetration::PenetrationSolver,
    response::{KartInfo, process_velocity_collisions},
    stats::{KartModifier, KartStats, ModifierHandle, ModifierStack},
};

/// Everything about a kart that persists between steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KartState {
    pub position: Vec3,
    pub rotation: Quat,
    /// World-space velocity (m/s).
    pub velocity: Vec3,
    pub drift: Drift,
    pub has_control: bool,
}

/// What one step did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutput {
    pub events: Vec<KartEvent>,
    /// Displacement committed this step.
    pub movement: Vec3,
}

#[derive(Clone, Copy, Debug)]
struct Reposition {
    position_delta: Vec3,
    rotation_delta: Quat,
}

pub struct Kart {
    id: KartId,
    collider: Option<ColliderId>,
    base_stats: KartStats,
    modifiers: ModifierStack,
    /// Effective stats of the last step.
    stats: KartStats,
    state: KartState,
    is_grounded: bool,
    ground_info: GroundInfo,
    ground: GroundSampler,
    penetration: PenetrationSolver,
    drift_settings: DriftSettings,
    airborne_orientation_speed: f32,
    rotation_correction_speed: f32,
    bump: f32,
    pending_reposition: Option<Reposition>,
}

impl Kart {
    /// Kart at rest at `pose`, with control enabled.
    pub fn new(id: KartId, config: &KartConfig, pose: Transform) -> KartResult<Self> {
        config.validate()?;
        let capsule = config.capsule_spec();
        let contact_offset = config.handling.contact_offset;

        Ok(Self {
            id,
            collider: None,
            base_stats: config.stats,
            modifiers: ModifierStack::new(config.airborne()),
            stats: config.stats,
            state: KartState {
                position: pose.translation,
                rotation: pose.rotation,
                velocity: Vec3::zeros(),
                drift: Drift::default(),
                has_control: true,
            },
            is_grounded: false,
            ground_info: GroundInfo::default(),
            ground: GroundSampler {
                probes: config.ground_probes(),
                capsule_radius: capsule.radius,
                contact_offset,
                filter: QueryFilter::solid(ground_layers()),
            },
            penetration: PenetrationSolver::new(
                capsule,
                contact_offset,
                QueryFilter::solid(colliding_layers()),
            ),
            drift_settings: config.drift_settings(),
            airborne_orientation_speed: config.handling.airborne_orientation_speed,
            rotation_correction_speed: config.handling.rotation_correction_speed,
            bump: config.handling.kart_to_kart_bump,
            pending_reposition: None,
        })
    }

    /// Attach the collider representing this kart so its own queries skip it.
    pub fn set_collider(&mut self, collider: Option<ColliderId>) {
        self.collider = collider;
        self.ground.filter = self.ground.filter.excluding(collider);
        self.penetration.filter = self.penetration.filter.excluding(collider);
    }

    #[inline]
    pub fn id(&self) -> KartId {
        self.id
    }

    #[inline]
    pub fn collider(&self) -> Option<ColliderId> {
        self.collider
    }

    #[inline]
    pub fn state(&self) -> &KartState {
        &self.state
    }

    #[inline]
    pub fn pose(&self) -> Transform {
        Transform::new(self.state.position, self.state.rotation)
    }

    #[inline]
    pub fn stats(&self) -> &KartStats {
        &self.stats
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.is_grounded
    }

    /// Ground classification from the start of the last step.
    #[inline]
    pub fn ground_info(&self) -> &GroundInfo {
        &self.ground_info
    }

    #[inline]
    pub fn drift_state(&self) -> DriftState {
        self.state.drift.state
    }

    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        self.penetration.capsule
    }

    /// Forward speed in the kart's drift-adjusted frame (negative when reversing).
    pub fn local_speed(&self) -> f32 {
        local_velocity(&self.state.rotation, &self.state.drift.offset, &self.state.velocity).z
    }

    /// Gap kept between the capsule and whatever it rests on.
    #[inline]
    pub fn contact_offset(&self) -> f32 {
        self.penetration.contact_offset
    }

    /// Snapshot read by other karts.
    pub fn info(&self) -> KartInfo {
        KartInfo {
            id: self.id,
            collider: self.collider,
            position: self.state.position,
            rotation: self.state.rotation,
            velocity: self.state.velocity,
            stats: self.stats,
            bump: self.bump,
        }
    }

    pub fn enable_control(&mut self) {
        self.state.has_control = true;
    }

    /// Take control away. Any drift ends immediately.
    pub fn disable_control(&mut self) {
        self.state.has_control = false;
        self.state.drift.cancel();
    }

    #[inline]
    pub fn is_controlled(&self) -> bool {
        self.state.has_control
    }

    /// Teleport by a delta on the next step. Velocity and drift are dropped now.
    pub fn force_move(&mut self, position_delta: Vec3, rotation_delta: Quat) {
        self.state.velocity = Vec3::zeros();
        self.state.drift.cancel();
        self.pending_reposition = Some(Reposition {
            position_delta,
            rotation_delta,
        });
    }

    pub fn add_modifier(&mut self, modifier: KartModifier) -> ModifierHandle {
        self.modifiers.add(modifier)
    }

    pub fn remove_modifier(&mut self, handle: ModifierHandle) -> Option<KartModifier> {
        self.modifiers.remove(handle)
    }

    /// Advance the kart by `dt` seconds.
    ///
    /// `others` are snapshots of the other karts, used for kart-to-kart collisions.
    /// A non-positive `dt` is a pause and changes nothing.
    pub fn step<W, I>(
        &mut self,
        world: &W,
        input: &mut I,
        others: &[KartInfo],
        dt: f32,
    ) -> StepOutput
    where
        W: CollisionQuery + ?Sized,
        I: KartInput + ?Sized,
    {
        let mut out = StepOutput::default();
        if dt <= 0.0 {
            return out;
        }

        if let Some(reposition) = self.pending_reposition.take() {
            self.state.position += reposition.position_delta;
            self.state.rotation = reposition.rotation_delta * self.state.rotation;
            out.movement = reposition.position_delta;
            return out;
        }

        self.stats = self.modifiers.compute(&self.base_stats);
        self.modifiers.clear_transient();

        let body = self.pose();
        let has_control = self.state.has_control;
        let mut rotation = body.rotation;
        let mut velocity = self.state.velocity;

        let current = self
            .ground
            .sample(world, &body, &rotation, Vec3::zeros(), &velocity, dt);
        self.ground_info = current;

        if current.is_grounded && input.hop_pressed() && has_control {
            velocity += hop_impulse(&rotation, self.stats.hop_height);
            input.consume_hop();
            out.events.push(KartEvent::Hopped);
            log::debug!("kart {} hopped", self.id.0);
        }

        if current.is_grounded && !self.is_grounded {
            out.events.push(KartEvent::BecameGrounded);
        } else if !current.is_grounded && self.is_grounded {
            out.events.push(KartEvent::BecameAirborne);
        }
        self.is_grounded = current.is_grounded;
        self.modifiers.set_airborne(!current.is_grounded);

        let next = self
            .ground
            .sample(world, &body, &rotation, velocity * dt, &velocity, dt);

        rotation = align_to_ground(
            &body.rotation,
            &rotation,
            &current,
            &next,
            self.airborne_orientation_speed,
            dt,
        );
        rotation = steer(
            &Steer {
                turn_speed: self.stats.turn_speed,
                steering_input: input.steering(),
                has_control,
                drift: &self.state.drift,
                drift_settings: &self.drift_settings,
                dt,
            },
            &rotation,
            &velocity,
        );

        let landing = Landing {
            hop_held: input.hop_held(),
            has_control,
            currently_grounded: current.is_grounded,
            grounded_next: next.is_grounded,
        };
        if self
            .state
            .drift
            .try_start(&self.drift_settings, &landing, &rotation, &velocity)
        {
            out.events.push(KartEvent::DriftStarted);
        }
        if self
            .state
            .drift
            .update_stop(&self.drift_settings, input.hop_held(), has_control, dt)
        {
            out.events.push(KartEvent::DriftEnded);
        }

        velocity = driving_velocity(
            &Drive {
                stats: &self.stats,
                ground: &current,
                has_control,
                throttle_input: input.acceleration(),
                dt,
            },
            &rotation,
            &self.state.drift.offset,
            &velocity,
        );

        let offset = self
            .penetration
            .solve(world, &self.state.position, &rotation);

        let me = KartInfo {
            velocity,
            ..self.info()
        };
        let collisions = process_velocity_collisions(
            world,
            &me,
            others,
            &self.penetration,
            &rotation,
            dt,
            offset,
        );
        velocity = collisions.velocity;
        let mut offset = collisions.penetration_offset;
        for modifier in collisions.transient {
            self.modifiers.push_transient(modifier);
        }
        out.events.extend(
            collisions
                .collided_with
                .into_iter()
                .map(|other| KartEvent::KartCollision { other }),
        );

        rotation = rotate_towards(
            body.rotation,
            rotation,
            self.rotation_correction_speed * dt,
        );

        let movement = adjust_velocity_by_penetration(&mut velocity, &mut offset, dt);

        self.state.velocity = velocity;
        self.state.rotation = rotation;
        self.state.position += movement;
        out.movement = movement;
        out
    }
}
