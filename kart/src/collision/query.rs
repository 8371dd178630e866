use super::types::{CapsuleSpec, ColliderId, KartId, Penetration, RayHit, SweepHit, Transform, Vec3};
use crate::{layers::LayerMask, race::CheckpointId, stats::KartModifier};

/// Which colliders a scene query may report.
#[derive(Clone, Copy, Debug)]
pub struct QueryFilter {
    /// Only colliders on one of these layers are considered.
    pub layers: LayerMask,
    /// Collider skipped by the query (usually the querying kart's own capsule).
    pub exclude: Option<ColliderId>,
    /// Whether sensor (trigger) colliders are reported.
    pub include_sensors: bool,
}

impl QueryFilter {
    /// Solid colliders on `layers`, sensors ignored.
    #[inline]
    pub fn solid(layers: LayerMask) -> Self {
        Self {
            layers,
            exclude: None,
            include_sensors: false,
        }
    }

    /// Solid and sensor colliders on `layers`.
    #[inline]
    pub fn with_sensors(layers: LayerMask) -> Self {
        Self {
            layers,
            exclude: None,
            include_sensors: true,
        }
    }

    #[inline]
    pub fn excluding(mut self, collider: Option<ColliderId>) -> Self {
        self.exclude = collider;
        self
    }
}

/// Collision-query backend consumed by the kart solver.
///
/// The solver never owns geometry. Everything it knows about the world comes through
/// these calls, so any engine able to answer them can host the karts. [`CollisionWorld`]
/// is the backend shipped with this crate.
///
/// [`CollisionWorld`]: super::world::CollisionWorld
pub trait CollisionQuery {
    /// Nearest hit along a ray. `direction` does not need to be normalized.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<RayHit>;

    /// Colliders overlapping the capsule spanned by segment `a`..`b`.
    fn overlap_capsule(&self, a: Vec3, b: Vec3, radius: f32, filter: &QueryFilter)
    -> Vec<ColliderId>;

    /// Separation of a kart capsule at `pose` from `other`, if they overlap.
    fn compute_penetration(
        &self,
        capsule: &CapsuleSpec,
        pose: &Transform,
        other: ColliderId,
    ) -> Option<Penetration>;

    /// Hits of the capsule spanned by `a`..`b` swept along `direction`, ordered by distance.
    fn capsule_cast(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Vec<SweepHit>;

    /// Stat modifier carried by a collider (boost pads, slow zones).
    fn modifier_of(&self, _collider: ColliderId) -> Option<KartModifier> {
        None
    }

    /// Kart owning a collider, if the collider is a kart capsule.
    fn kart_of(&self, _collider: ColliderId) -> Option<KartId> {
        None
    }

    /// Checkpoint represented by a collider, if any.
    fn checkpoint_of(&self, _collider: ColliderId) -> Option<CheckpointId> {
        None
    }
}
