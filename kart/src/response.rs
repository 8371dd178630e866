//! Collisions found along a kart's movement for the step.
//!
//! The kart's own capsule is swept along its movement. Hits are handled in distance order:
//! - colliders carrying a stat modifier hand it to the kart for its next step;
//! - kart capsules replace the kart's velocity through [`KartCollider::modify_velocity`];
//! - anything else gets another penetration solve iteration.

use crate::{
    collision::{ColliderId, CollisionQuery, KartId, QueryFilter, Quat, SweepHit, Vec3},
    constants::DIST_EPS,
    penetration::PenetrationSolver,
    stats::{KartModifier, KartStats},
};

/// Read-only view of a kart, taken at the start of a simulation tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KartInfo {
    pub id: KartId,
    pub collider: Option<ColliderId>,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Effective stats from the kart's last step.
    pub stats: KartStats,
    /// Push given to lighter karts that hit this one.
    pub bump: f32,
}

/// Something a kart can collide with that decides the colliding kart's new velocity.
pub trait KartCollider {
    fn modify_velocity(&self, colliding: &KartInfo, hit: &SweepHit) -> Vec3;
}

impl KartCollider for KartInfo {
    /// A kart no heavier than this one bounces off it, away from this kart's position and
    /// harder the lighter it is. A heavier kart takes this kart's velocity.
    fn modify_velocity(&self, colliding: &KartInfo, _hit: &SweepHit) -> Vec3 {
        let weight_difference = colliding.stats.weight - self.stats.weight;
        if weight_difference > 0.0 {
            return self.velocity;
        }
        let away = (colliding.position - self.position)
            .try_normalize(DIST_EPS)
            .unwrap_or_else(Vec3::zeros);
        self.velocity + away * (self.bump - weight_difference)
    }
}

/// Result of [`process_velocity_collisions`].
#[derive(Clone, Debug, Default)]
pub struct CollisionOutcome {
    pub velocity: Vec3,
    pub penetration_offset: Vec3,
    /// Modifiers picked up this step, applied on the next one.
    pub transient: Vec<KartModifier>,
    /// Karts whose collision response replaced the velocity, in hit order.
    pub collided_with: Vec<KartId>,
}

/// Sweep the kart along `velocity * dt + penetration_offset` and react to what it hits.
///
/// `me` describes the moving kart; its velocity is replaced by `velocity` as collisions
/// change it. Other karts are looked up in `others`; a kart collider with no entry there is
/// treated like static geometry.
pub fn process_velocity_collisions<W: CollisionQuery + ?Sized>(
    world: &W,
    me: &KartInfo,
    others: &[KartInfo],
    solver: &PenetrationSolver,
    rotation: &Quat,
    dt: f32,
    penetration_offset: Vec3,
) -> CollisionOutcome {
    let mut out = CollisionOutcome {
        velocity: me.velocity,
        penetration_offset,
        ..CollisionOutcome::default()
    };

    let sweep = me.velocity * dt + penetration_offset;
    let filter = QueryFilter::with_sensors(solver.filter.layers).excluding(me.collider);
    let (a, b) = solver.capsule.segment(me.position, *rotation);
    let hits = world.capsule_cast(a, b, solver.capsule.radius, sweep, sweep.norm(), &filter);

    for hit in &hits {
        if let Some(modifier) = world.modifier_of(hit.collider) {
            out.transient.push(modifier);
        }

        let other = world
            .kart_of(hit.collider)
            .and_then(|id| others.iter().find(|k| k.id == id && k.id != me.id));
        match other {
            Some(other) => {
                let current = KartInfo {
                    velocity: out.velocity,
                    ..*me
                };
                out.velocity = other.modify_velocity(&current, hit);
                out.collided_with.push(other.id);
                log::debug!("kart {} collided with kart {}", me.id.0, other.id.0);
            }
            None => {
                out.penetration_offset =
                    solver.iterate(world, &me.position, rotation, out.penetration_offset);
            }
        }
    }

    out
}
