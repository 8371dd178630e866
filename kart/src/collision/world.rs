//! Parry-backed collision world for kart racing.
//!
//! The world holds two kinds of colliders:
//! - Track colliders (ground, walls, zones, checkpoints) described by [`ColliderDef`]. They never
//!   move and are indexed by a BVH built once in [`CollisionWorld::build`].
//! - Kart capsules, registered with [`CollisionWorld::insert_kart`] and moved every tick with
//!   [`CollisionWorld::set_kart_pose`]. There are few of them, so they are scanned linearly.
//!
//! Determinism
//! - Track colliders are sorted by `id` before insertion, so identical inputs build identical
//!   worlds and queries visit colliders in the same order.

use std::cmp::Ordering;

use nalgebra as na;
use rapier3d::parry::shape::SharedShape;

use super::{
    broad::{self, WorldAccel},
    narrow_phase,
    query::{CollisionQuery, QueryFilter},
    types::{
        CapsuleSpec, ColliderId, ColliderTag, KartId, Penetration, Quat, RayHit, SweepHit,
        Transform, Vec3,
    },
};
use crate::{
    constants::{BROAD_PHASE_MARGIN, DIST_EPS},
    layers::CollisionLayer,
    race::CheckpointId,
    stats::KartModifier,
};

/// Canonical definition of an immutable track collider.
#[derive(Clone, Debug)]
pub struct ColliderDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vec3,
    /// World-space rotation (unit quaternion).
    pub rotation: Quat,
    pub shape: ColliderShapeDef,
    pub layer: CollisionLayer,
    /// Sensors report overlaps to trigger-aware queries but never block movement.
    pub sensor: bool,
    pub tag: ColliderTag,
    /// Stat modifier applied to karts touching this collider.
    pub modifier: Option<KartModifier>,
}

impl ColliderDef {
    /// Solid ground collider.
    pub fn ground(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            translation,
            rotation,
            shape,
            layer: CollisionLayer::Ground,
            sensor: false,
            tag: ColliderTag::Static,
            modifier: None,
        }
    }

    /// Solid wall collider.
    pub fn wall(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            layer: CollisionLayer::Wall,
            ..Self::ground(id, translation, rotation, shape)
        }
    }

    /// Sensor zone applying `modifier` to karts passing through it.
    pub fn zone(
        id: u32,
        translation: Vec3,
        rotation: Quat,
        shape: ColliderShapeDef,
        modifier: KartModifier,
    ) -> Self {
        Self {
            id,
            translation,
            rotation,
            shape,
            layer: CollisionLayer::Trigger,
            sensor: true,
            tag: ColliderTag::Zone,
            modifier: Some(modifier),
        }
    }

    /// Sensor box marking a checkpoint.
    pub fn checkpoint(
        id: u32,
        checkpoint: CheckpointId,
        pose: Transform,
        half_extents: Vec3,
    ) -> Self {
        Self {
            id,
            translation: pose.translation,
            rotation: pose.rotation,
            shape: ColliderShapeDef::Cuboid { half_extents },
            layer: CollisionLayer::Trigger,
            sensor: true,
            tag: ColliderTag::Checkpoint(checkpoint),
            modifier: None,
        }
    }
}

/// Supported collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space).
    ///
    /// The plane normal is derived from the pose as `rotation * +Y`, and the plane passes
    /// through `translation + normal * offset_along_normal`.
    Plane { offset_along_normal: f32 },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },
}

struct WorldCollider {
    shape: SharedShape,
    pose: Transform,
    layer: CollisionLayer,
    sensor: bool,
    tag: ColliderTag,
    modifier: Option<KartModifier>,
}

/// In-memory collision world answering the kart solver's [`CollisionQuery`] calls.
pub struct CollisionWorld {
    colliders: Vec<WorldCollider>,
    /// Indices of kart capsules inside `colliders`.
    kart_indices: Vec<usize>,
    accel: WorldAccel,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self {
            colliders: Vec::new(),
            kart_indices: Vec::new(),
            accel: WorldAccel::empty(),
        }
    }
}

impl CollisionWorld {
    /// Build a world from track collider definitions.
    ///
    /// Determinism
    /// - The input is sorted by `id` before insertion.
    /// - Any NaN/invalid values should be filtered/validated by the caller.
    pub fn build(mut defs: Vec<ColliderDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let colliders: Vec<WorldCollider> = defs.into_iter().map(collider_from_def).collect();
        let accel = broad::build_world_accel(
            colliders
                .iter()
                .enumerate()
                .map(|(i, c)| (i, &*c.shape, c.pose.iso())),
        );

        log::debug!(
            "built collision world: {} bounded, {} unbounded colliders",
            accel.bounded_len(),
            accel.unbounded_indices.len()
        );

        Self {
            colliders,
            kart_indices: Vec::new(),
            accel,
        }
    }

    /// Register the capsule of `kart` and return its collider id.
    pub fn insert_kart(
        &mut self,
        kart: KartId,
        capsule: CapsuleSpec,
        pose: Transform,
    ) -> ColliderId {
        let index = self.colliders.len();
        self.colliders.push(WorldCollider {
            shape: SharedShape::capsule_z(capsule.half_height, capsule.radius),
            pose,
            layer: CollisionLayer::Kart,
            sensor: false,
            tag: ColliderTag::Kart(kart),
            modifier: None,
        });
        self.kart_indices.push(index);
        ColliderId(index as u32)
    }

    /// Move a kart capsule. Ids that are not kart capsules are ignored.
    pub fn set_kart_pose(&mut self, collider: ColliderId, pose: Transform) {
        let index = collider.0 as usize;
        if !self.kart_indices.contains(&index) {
            log::warn!("set_kart_pose on non-kart collider {:?}", collider);
            return;
        }
        self.colliders[index].pose = pose;
    }

    pub fn tag_of(&self, collider: ColliderId) -> Option<ColliderTag> {
        self.colliders.get(collider.0 as usize).map(|c| c.tag)
    }

    /// Candidate indices: broad-phase track hits followed by every kart capsule.
    fn candidates(&self, aabb: &rapier3d::parry::bounding_volume::Aabb) -> Vec<usize> {
        let mut out = broad::query_candidates(&self.accel, aabb);
        out.extend(self.kart_indices.iter().copied());
        out
    }

    fn passes(&self, index: usize, filter: &QueryFilter) -> bool {
        let c = &self.colliders[index];
        filter.layers.accepts(c.layer)
            && (filter.include_sensors || !c.sensor)
            && filter.exclude != Some(ColliderId(index as u32))
    }
}

impl CollisionQuery for CollisionWorld {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(DIST_EPS)?;
        let aabb = broad::swept_sphere_aabb(origin, dir * max_distance, 0.0, BROAD_PHASE_MARGIN);

        let mut best: Option<RayHit> = None;
        for index in self.candidates(&aabb) {
            if !self.passes(index, filter) {
                continue;
            }
            let c = &self.colliders[index];
            if let Some((distance, normal)) =
                narrow_phase::cast_ray_against(&*c.shape, &c.pose.iso(), origin, dir, max_distance)
            {
                if best.is_none_or(|b| distance < b.distance) {
                    best = Some(RayHit {
                        collider: ColliderId(index as u32),
                        distance,
                        point: origin + dir * distance,
                        normal,
                    });
                }
            }
        }
        best
    }

    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        filter: &QueryFilter,
    ) -> Vec<ColliderId> {
        let aabb = broad::capsule_aabb(a, b, radius, BROAD_PHASE_MARGIN);
        self.candidates(&aabb)
            .into_iter()
            .filter(|&index| self.passes(index, filter))
            .filter(|&index| {
                let c = &self.colliders[index];
                narrow_phase::capsule_overlaps(a, b, radius, &*c.shape, &c.pose.iso())
            })
            .map(|index| ColliderId(index as u32))
            .collect()
    }

    fn compute_penetration(
        &self,
        capsule: &CapsuleSpec,
        pose: &Transform,
        other: ColliderId,
    ) -> Option<Penetration> {
        let c = self.colliders.get(other.0 as usize)?;
        narrow_phase::capsule_penetration(capsule, &pose.iso(), &*c.shape, &c.pose.iso())
    }

    fn capsule_cast(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Vec<SweepHit> {
        let Some(dir) = direction.try_normalize(DIST_EPS) else {
            return Vec::new();
        };
        let aabb = broad::swept_capsule_aabb(a, b, dir * max_distance, radius, BROAD_PHASE_MARGIN);

        let mut hits: Vec<SweepHit> = self
            .candidates(&aabb)
            .into_iter()
            .filter(|&index| self.passes(index, filter))
            .filter_map(|index| {
                let c = &self.colliders[index];
                narrow_phase::capsule_cast_against(
                    a,
                    b,
                    radius,
                    dir,
                    max_distance,
                    &*c.shape,
                    &c.pose.iso(),
                )
                .map(|(distance, point, normal)| SweepHit {
                    collider: ColliderId(index as u32),
                    distance,
                    point,
                    normal,
                })
            })
            .collect();

        // Stable sort keeps insertion order between equal distances.
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits
    }

    fn modifier_of(&self, collider: ColliderId) -> Option<KartModifier> {
        self.colliders.get(collider.0 as usize)?.modifier.clone()
    }

    fn kart_of(&self, collider: ColliderId) -> Option<KartId> {
        match self.tag_of(collider)? {
            ColliderTag::Kart(kart) => Some(kart),
            _ => None,
        }
    }

    fn checkpoint_of(&self, collider: ColliderId) -> Option<CheckpointId> {
        match self.tag_of(collider)? {
            ColliderTag::Checkpoint(checkpoint) => Some(checkpoint),
            _ => None,
        }
    }
}

/// Build a world collider from a `ColliderDef`.
fn collider_from_def(def: ColliderDef) -> WorldCollider {
    let (shape, pose) = match def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Derive world-space plane normal from pose rotation: n = R * +Y.
            // The half-space is placed at the plane point with identity rotation.
            let n = def.rotation * Vec3::y();
            let unit_n = na::Unit::new_normalize(n);
            let point = def.translation + unit_n.into_inner() * offset_along_normal;
            (
                SharedShape::halfspace(unit_n),
                Transform::new(point, Quat::identity()),
            )
        }
        ColliderShapeDef::Cuboid { half_extents } => (
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Transform::new(def.translation, def.rotation),
        ),
        ColliderShapeDef::Sphere { radius } => (
            SharedShape::ball(radius),
            Transform::new(def.translation, def.rotation),
        ),
        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => (
            SharedShape::capsule_y(half_height, radius),
            Transform::new(def.translation, def.rotation),
        ),
        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => (
            SharedShape::cylinder(half_height, radius),
            Transform::new(def.translation, def.rotation),
        ),
    };

    WorldCollider {
        shape,
        pose,
        layer: def.layer,
        sensor: def.sensor,
        tag: def.tag,
        modifier: def.modifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{colliding_layers, ground_layers};

    fn flat_track() -> CollisionWorld {
        CollisionWorld::build(vec![
            ColliderDef::ground(
                1,
                Vec3::zeros(),
                Quat::identity(),
                ColliderShapeDef::Plane {
                    offset_along_normal: 0.0,
                },
            ),
            ColliderDef::wall(
                2,
                Vec3::new(0.0, 1.0, 10.0),
                Quat::identity(),
                ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(5.0, 1.0, 0.5),
                },
            ),
        ])
    }

    #[test]
    fn ground_ray_ignores_walls_and_excluded_kart() {
        let mut world = flat_track();
        let capsule = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        let kart = world.insert_kart(
            KartId(0),
            capsule,
            Transform::new(Vec3::new(0.0, 0.5, 0.0), Quat::identity()),
        );

        let filter = QueryFilter::solid(colliding_layers()).excluding(Some(kart));
        let hit = world
            .cast_ray(Vec3::new(0.0, 2.0, 0.0), -Vec3::y(), 5.0, &filter)
            .expect("ground below");
        assert_eq!(world.tag_of(hit.collider), Some(ColliderTag::Static));
        assert!((hit.distance - 2.0).abs() < 1.0e-4);
        assert!(hit.point.y.abs() < 1.0e-4);

        let no_kart_filter = QueryFilter::solid(colliding_layers());
        let hit = world
            .cast_ray(Vec3::new(0.0, 2.0, 0.0), -Vec3::y(), 5.0, &no_kart_filter)
            .expect("kart capsule top");
        assert_eq!(world.kart_of(hit.collider), Some(KartId(0)));

        let ground_only = QueryFilter::solid(ground_layers());
        assert!(
            world
                .cast_ray(Vec3::new(0.0, 1.0, 5.0), Vec3::z(), 10.0, &ground_only)
                .is_none()
        );
    }

    #[test]
    fn capsule_cast_orders_hits_and_respects_sensors() {
        let world = CollisionWorld::build(vec![
            ColliderDef::wall(
                1,
                Vec3::new(0.0, 0.0, 8.0),
                Quat::identity(),
                ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(2.0, 2.0, 0.5),
                },
            ),
            ColliderDef::zone(
                2,
                Vec3::new(0.0, 0.0, 4.0),
                Quat::identity(),
                ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(2.0, 2.0, 0.5),
                },
                KartModifier::Default,
            ),
        ]);

        let all = QueryFilter::with_sensors(colliding_layers());
        let hits = world.capsule_cast(Vec3::zeros(), Vec3::zeros(), 0.5, Vec3::z(), 20.0, &all);
        assert_eq!(hits.len(), 2);
        assert_eq!(world.tag_of(hits[0].collider), Some(ColliderTag::Zone));
        assert!(world.modifier_of(hits[0].collider).is_some());
        assert!(hits[0].distance < hits[1].distance);

        let solid = QueryFilter::solid(colliding_layers());
        let hits = world.capsule_cast(Vec3::zeros(), Vec3::zeros(), 0.5, Vec3::z(), 20.0, &solid);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 7.0).abs() < 1.0e-3);
    }

    #[test]
    fn moved_kart_capsule_is_found_by_overlap() {
        let mut world = flat_track();
        let capsule = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        let kart = world.insert_kart(KartId(3), capsule, Transform::default());
        world.set_kart_pose(
            kart,
            Transform::new(Vec3::new(30.0, 5.0, 30.0), Quat::identity()),
        );

        let filter = QueryFilter::solid(colliding_layers());
        let found = world.overlap_capsule(
            Vec3::new(30.0, 5.0, 29.0),
            Vec3::new(30.0, 5.0, 31.0),
            0.5,
            &filter,
        );
        assert_eq!(found, vec![kart]);
    }
}
