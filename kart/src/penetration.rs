use crate::{
    collision::{CapsuleSpec, CollisionQuery, QueryFilter, Quat, Transform, Vec3},
    constants::MAX_PENETRATION_SOLVES,
};

/// Pushes a kart capsule out of the colliders it overlaps.
///
/// The result is an offset, not a new position: the caller folds it into the step's
/// movement so velocity can be adjusted against it.
#[derive(Clone, Copy, Debug)]
pub struct PenetrationSolver {
    pub capsule: CapsuleSpec,
    pub contact_offset: f32,
    pub iterations: usize,
    /// Solid colliding layers, excluding the kart's own collider.
    pub filter: QueryFilter,
}

impl PenetrationSolver {
    pub fn new(capsule: CapsuleSpec, contact_offset: f32, filter: QueryFilter) -> Self {
        Self {
            capsule,
            contact_offset,
            iterations: MAX_PENETRATION_SOLVES,
            filter,
        }
    }

    /// Run every iteration from a zero offset.
    pub fn solve<W: CollisionQuery + ?Sized>(
        &self,
        world: &W,
        position: &Vec3,
        rotation: &Quat,
    ) -> Vec3 {
        (0..self.iterations).fold(Vec3::zeros(), |summed, _| {
            self.iterate(world, position, rotation, summed)
        })
    }

    /// One solve iteration with the capsule displaced by `summed`.
    ///
    /// Every overlap proposes `direction * (distance + contact_offset)`. On each axis the
    /// proposal replaces the running offset only if it is larger in magnitude, so overlaps
    /// pushing the same way do not stack.
    pub fn iterate<W: CollisionQuery + ?Sized>(
        &self,
        world: &W,
        position: &Vec3,
        rotation: &Quat,
        mut summed: Vec3,
    ) -> Vec3 {
        let center = position + summed;
        let (a, b) = self.capsule.segment(center, *rotation);
        let pose = Transform::new(center, *rotation);

        for other in world.overlap_capsule(a, b, self.capsule.radius, &self.filter) {
            let Some(penetration) = world.compute_penetration(&self.capsule, &pose, other) else {
                continue;
            };
            let offset = penetration.direction * (penetration.distance + self.contact_offset);
            for axis in 0..3 {
                if offset[axis].abs() > summed[axis].abs() {
                    summed[axis] = offset[axis];
                }
            }
        }

        summed
    }
}
