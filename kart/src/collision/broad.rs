use nalgebra as na;
use rapier3d::parry::{
    bounding_volume::Aabb,
    partitioning::{Bvh, BvhBuildStrategy},
    shape::{Shape, ShapeType},
};

use super::types::{Iso, Vec3};

/// Acceleration structure for broad-phase queries over immutable track geometry.
///
/// Notes:
/// - Finite shapes are stored as world-space AABBs in a BVH.
/// - Half-spaces (infinite ground planes) cannot be bounded and are kept in
///   `unbounded_indices`; every query reports them as candidates.
/// - `leaf_indices` maps each BVH leaf back to the collider index it was built from.
pub struct WorldAccel {
    pub bvh: Bvh,
    pub leaf_indices: Vec<usize>,
    pub unbounded_indices: Vec<usize>,
}

impl WorldAccel {
    /// Accelerator with no entries.
    pub fn empty() -> Self {
        Self {
            bvh: Bvh::from_leaves(BvhBuildStrategy::Binned, &[]),
            leaf_indices: Vec::new(),
            unbounded_indices: Vec::new(),
        }
    }

    /// Number of bounded entries in the BVH.
    #[inline]
    pub fn bounded_len(&self) -> usize {
        self.leaf_indices.len()
    }
}

/// Build the accelerator over `(collider index, shape, pose)` entries.
pub fn build_world_accel<'a>(
    entries: impl IntoIterator<Item = (usize, &'a dyn Shape, Iso)>,
) -> WorldAccel {
    let mut aabbs: Vec<Aabb> = Vec::new();
    let mut leaf_indices: Vec<usize> = Vec::new();
    let mut unbounded_indices: Vec<usize> = Vec::new();

    for (index, shape, iso) in entries {
        if shape.shape_type() == ShapeType::HalfSpace {
            unbounded_indices.push(index);
            continue;
        }
        aabbs.push(shape.compute_aabb(&iso));
        leaf_indices.push(index);
    }

    WorldAccel {
        bvh: Bvh::from_leaves(BvhBuildStrategy::Binned, &aabbs),
        leaf_indices,
        unbounded_indices,
    }
}

/// Collider indices whose bounds intersect `aabb`, unbounded entries first.
pub fn query_candidates(accel: &WorldAccel, aabb: &Aabb) -> Vec<usize> {
    let mut out = accel.unbounded_indices.clone();
    out.extend(
        accel
            .bvh
            .intersect_aabb(aabb)
            .map(|leaf_idx| accel.leaf_indices[leaf_idx as usize]),
    );
    out
}

/// AABB of a sphere of `radius` swept from `origin` to `origin + translation`.
///
/// A plain ray is a sphere of radius zero. The result is inflated by `margin`.
pub fn swept_sphere_aabb(origin: Vec3, translation: Vec3, radius: f32, margin: f32) -> Aabb {
    let start = point_aabb(origin, radius);
    let end = point_aabb(origin + translation, radius);
    aabb_inflate(&aabb_union(&start, &end), margin)
}

/// AABB of a capsule spanned by `a`..`b` swept by `translation`, inflated by `margin`.
pub fn swept_capsule_aabb(a: Vec3, b: Vec3, translation: Vec3, radius: f32, margin: f32) -> Aabb {
    let start = capsule_aabb(a, b, radius, 0.0);
    let end = capsule_aabb(a + translation, b + translation, radius, 0.0);
    aabb_inflate(&aabb_union(&start, &end), margin)
}

/// AABB of a capsule spanned by segment `a`..`b`, inflated by `margin`.
pub fn capsule_aabb(a: Vec3, b: Vec3, radius: f32, margin: f32) -> Aabb {
    aabb_inflate(&aabb_union(&point_aabb(a, radius), &point_aabb(b, radius)), margin)
}

fn point_aabb(center: Vec3, radius: f32) -> Aabb {
    let r = Vec3::new(radius, radius, radius);
    Aabb {
        mins: na::Point3::from(center - r),
        maxs: na::Point3::from(center + r),
    }
}

/// Compute the union of two AABBs.
fn aabb_union(a: &Aabb, b: &Aabb) -> Aabb {
    let min = na::Point3::new(
        a.mins.x.min(b.mins.x),
        a.mins.y.min(b.mins.y),
        a.mins.z.min(b.mins.z),
    );
    let max = na::Point3::new(
        a.maxs.x.max(b.maxs.x),
        a.maxs.y.max(b.maxs.y),
        a.maxs.z.max(b.maxs.z),
    );
    Aabb {
        mins: min,
        maxs: max,
    }
}

/// Inflate an AABB by `margin` on all sides.
fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = na::Vector3::new(margin, margin, margin);
    Aabb {
        mins: a.mins - delta,
        maxs: a.maxs + delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::parry::shape::{Ball, Cuboid, HalfSpace};

    #[test]
    fn half_spaces_are_always_candidates() {
        let plane = HalfSpace::new(na::Unit::new_normalize(Vec3::y()));
        let ball = Ball::new(1.0);
        let accel = build_world_accel([
            (0, &plane as &dyn Shape, Iso::identity()),
            (1, &ball as &dyn Shape, Iso::translation(50.0, 0.0, 0.0)),
        ]);

        assert_eq!(accel.bounded_len(), 1);
        let far_away = swept_sphere_aabb(Vec3::new(-50.0, 0.0, 0.0), Vec3::x(), 0.5, 0.0);
        assert_eq!(query_candidates(&accel, &far_away), vec![0]);
    }

    #[test]
    fn bounded_shapes_are_pruned_by_overlap() {
        let a = Cuboid::new(Vec3::new(1.0, 1.0, 1.0));
        let b = Cuboid::new(Vec3::new(1.0, 1.0, 1.0));
        let accel = build_world_accel([
            (3, &a as &dyn Shape, Iso::translation(0.0, 0.0, 0.0)),
            (7, &b as &dyn Shape, Iso::translation(20.0, 0.0, 0.0)),
        ]);

        let near_b = capsule_aabb(Vec3::new(19.0, 0.0, 0.0), Vec3::new(19.0, 0.0, 1.0), 0.5, 0.0);
        assert_eq!(query_candidates(&accel, &near_b), vec![7]);
    }
}
