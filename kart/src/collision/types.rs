/*!
Core collision types and math aliases shared by the collision submodules.

This module contains no algorithms. It defines the data types
exchanged between:
- the `CollisionQuery` backend trait and its implementations
- the kart solver stages (ground probes, penetration solve, velocity collisions)
- the simulation loop that keeps kart capsules in sync with the world
*/

use nalgebra as na;

use crate::race::CheckpointId;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// A rigid transform (isometry) in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Convert to nalgebra `Isometry3` for use with parry narrow-phase queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }
}

/// Capsule specification for a kart.
///
/// The capsule axis runs along the kart's local +Z (forward) axis. `half_height` is the
/// half-length of the segment between the two cap centers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub half_height: f32,
}

impl CapsuleSpec {
    /// World-space segment endpoints of the capsule axis for the given pose.
    #[inline]
    pub fn segment(&self, center: Vec3, rotation: Quat) -> (Vec3, Vec3) {
        let axis = rotation * Vec3::z() * self.half_height;
        (center + axis, center - axis)
    }
}

/// Index of a collider inside a collision backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u32);

/// Index of a kart inside a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KartId(pub u32);

/// What a collider represents to the kart solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColliderTag {
    /// Track geometry, walls, props.
    Static,
    /// The capsule of a kart.
    Kart(KartId),
    /// A checkpoint trigger volume.
    Checkpoint(CheckpointId),
    /// A trigger zone (e.g. boost pad). The modifier lives on the collider itself.
    Zone,
}

/// Nearest hit returned by a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub collider: ColliderId,
    /// Distance along the (unit) ray direction.
    pub distance: f32,
    /// World-space impact point.
    pub point: Vec3,
    /// World-space surface normal at the impact point.
    pub normal: Vec3,
}

/// A single hit returned by a capsule sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    pub collider: ColliderId,
    /// Distance travelled by the capsule before contact. Zero when already overlapping.
    pub distance: f32,
    /// World-space contact point on the hit collider.
    pub point: Vec3,
    /// World-space contact normal, pointing away from the hit collider.
    pub normal: Vec3,
}

/// Minimal translation that separates two overlapping shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penetration {
    /// Unit direction to move the first shape along.
    pub direction: Vec3,
    /// Depth of the overlap along `direction` (meters, positive).
    pub distance: f32,
}
