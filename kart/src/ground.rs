//! Ground detection from four downward ray probes.
//!
//! Each probe sits at a kart-local offset (front, right, left, rear) and casts along the
//! kart's down direction. The shortest probe distance classifies the kart:
//! - capsule touching: within `radius + contact_offset`
//! - grounded: within the touching distance plus [`GROUND_TO_CAPSULE_OFFSET`]
//! - close to ground: any probe hit within the search distance
//!
//! The ground normal is synthesized from however many probes hit.

use crate::{
    collision::{CollisionQuery, QueryFilter, Quat, RayHit, Transform, Vec3},
    constants::{DIST_EPS, GROUND_TO_CAPSULE_OFFSET, VELOCITY_NORMAL_AIRBORNE_DOT},
};

/// Ground classification for one kart pose. Recomputed every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundInfo {
    pub normal: Vec3,
    pub is_grounded: bool,
    pub is_capsule_touching: bool,
    pub is_close_to_ground: bool,
}

impl Default for GroundInfo {
    fn default() -> Self {
        Self {
            normal: Vec3::y(),
            is_grounded: false,
            is_capsule_touching: false,
            is_close_to_ground: false,
        }
    }
}

/// Kart-local probe origins. `right` must lie on the kart's +X side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundProbes {
    pub front: Vec3,
    pub right: Vec3,
    pub left: Vec3,
    pub rear: Vec3,
}

impl Default for GroundProbes {
    fn default() -> Self {
        Self {
            front: Vec3::new(0.0, 0.0, 0.75),
            right: Vec3::new(0.5, 0.0, 0.0),
            left: Vec3::new(-0.5, 0.0, 0.0),
            rear: Vec3::new(0.0, 0.0, -0.75),
        }
    }
}

/// Probe layout plus the capsule dimensions the distance thresholds derive from.
#[derive(Clone, Copy, Debug)]
pub struct GroundSampler {
    pub probes: GroundProbes,
    pub capsule_radius: f32,
    pub contact_offset: f32,
    /// Ground layers, excluding the kart's own collider.
    pub filter: QueryFilter,
}

impl GroundSampler {
    #[inline]
    pub fn touching_distance(&self) -> f32 {
        self.capsule_radius + self.contact_offset
    }

    #[inline]
    pub fn grounded_distance(&self) -> f32 {
        self.touching_distance() + GROUND_TO_CAPSULE_OFFSET
    }

    /// Sample the ground below a kart.
    ///
    /// - `body` places the probes (the committed kart pose).
    /// - `orientation` gives the down direction (the rotation being built this step).
    /// - `offset` shifts every probe, e.g. by the upcoming movement.
    /// - Probe origins are also advanced by `velocity * dt`.
    pub fn sample<W: CollisionQuery + ?Sized>(
        &self,
        world: &W,
        body: &Transform,
        orientation: &Quat,
        offset: Vec3,
        velocity: &Vec3,
        dt: f32,
    ) -> GroundInfo {
        let shift = offset + velocity * dt;
        let down = orientation * -Vec3::y();

        let touching = self.touching_distance();
        let grounded = self.grounded_distance();
        let close = (grounded + self.capsule_radius).max(velocity.y);

        let cast = |probe: &Vec3| -> Option<RayHit> {
            let origin = body.translation + body.rotation * probe + shift;
            world.cast_ray(origin, down, close, &self.filter)
        };
        let hits = ProbeHits {
            front: cast(&self.probes.front),
            right: cast(&self.probes.right),
            left: cast(&self.probes.left),
            rear: cast(&self.probes.rear),
        };

        let nearest = hits
            .iter()
            .flatten()
            .map(|h| h.distance)
            .fold(f32::INFINITY, f32::min);

        let mut info = GroundInfo {
            normal: hits.normal(),
            is_grounded: nearest <= grounded,
            is_capsule_touching: nearest <= touching,
            is_close_to_ground: hits.count() > 0,
        };

        // Moving away from the surface fast enough means the kart is leaving it.
        if info.is_grounded {
            let heading = velocity.try_normalize(DIST_EPS).unwrap_or_else(Vec3::zeros);
            if info.normal.dot(&heading) > VELOCITY_NORMAL_AIRBORNE_DOT {
                info.is_grounded = false;
            }
        }

        info
    }
}

struct ProbeHits {
    front: Option<RayHit>,
    right: Option<RayHit>,
    left: Option<RayHit>,
    rear: Option<RayHit>,
}

impl ProbeHits {
    fn iter(&self) -> impl Iterator<Item = &Option<RayHit>> {
        [&self.front, &self.right, &self.left, &self.rear].into_iter()
    }

    fn count(&self) -> usize {
        self.iter().filter(|h| h.is_some()).count()
    }

    fn normal(&self) -> Vec3 {
        let raw = match (&self.front, &self.right, &self.left, &self.rear) {
            (None, None, None, None) => Vec3::y(),
            (Some(front), Some(right), Some(left), Some(rear)) => {
                let (f, r, l, b) = (front.point, right.point, left.point, rear.point);
                (plane_normal(&r, &b, &l)
                    + plane_normal(&f, &b, &l)
                    + plane_normal(&f, &r, &b)
                    + plane_normal(&r, &l, &f))
                    * 0.25
            }
            (None, Some(right), Some(left), Some(rear)) => {
                plane_normal(&right.point, &rear.point, &left.point)
            }
            (Some(front), None, Some(left), Some(rear)) => {
                plane_normal(&front.point, &rear.point, &left.point)
            }
            (Some(front), Some(right), None, Some(rear)) => {
                plane_normal(&front.point, &right.point, &rear.point)
            }
            (Some(front), Some(right), Some(left), None) => {
                plane_normal(&right.point, &left.point, &front.point)
            }
            // One or two hits: average the normals that were actually hit.
            _ if self.count() == 1 => self.iter().flatten().map(|h| h.normal).sum(),
            _ => self.iter().flatten().map(|h| h.normal).sum::<Vec3>() * 0.5,
        };
        raw.try_normalize(DIST_EPS).unwrap_or_else(Vec3::y)
    }
}

/// Normal of the plane through `origin`, `a` and `b`: `(a - origin) x (b - origin)`.
#[inline]
fn plane_normal(origin: &Vec3, a: &Vec3, b: &Vec3) -> Vec3 {
    (a - origin).cross(&(b - origin))
}
