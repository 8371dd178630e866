//! Small scalar and rotation helpers shared by the solver stages.

use nalgebra as na;

use crate::{
    collision::{Quat, Vec3},
    constants::DIST_EPS,
};

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Rotate `from` toward `to` by at most `max_degrees`.
pub fn rotate_towards(from: Quat, to: Quat, max_degrees: f32) -> Quat {
    let angle = from.angle_to(&to);
    if angle <= DIST_EPS {
        return to;
    }
    let t = (max_degrees.max(0.0).to_radians() / angle).min(1.0);
    from.try_slerp(&to, t, DIST_EPS).unwrap_or(to)
}

/// Shortest rotation taking direction `from` onto direction `to` (identity when undefined).
#[inline]
pub fn from_to_rotation(from: &Vec3, to: &Vec3) -> Quat {
    Quat::rotation_between(from, to).unwrap_or_else(Quat::identity)
}

/// Rotation of `degrees` about world +Y.
#[inline]
pub fn yaw(degrees: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), degrees.to_radians())
}

/// Unsigned angle in degrees between two directions (0 when either is degenerate).
pub fn angle_between(from: &Vec3, to: &Vec3) -> f32 {
    let denom = (from.norm_squared() * to.norm_squared()).sqrt();
    if denom <= DIST_EPS {
        return 0.0;
    }
    (from.dot(to) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle in degrees from `from` to `to`, signed by the rotation sense about `axis`.
pub fn signed_angle(from: &Vec3, to: &Vec3, axis: &Vec3) -> f32 {
    let unsigned = angle_between(from, to);
    let sign = axis.dot(&from.cross(to));
    if sign < 0.0 { -unsigned } else { unsigned }
}

/// `v` with its Y component removed and normalized (zero when `v` is vertical).
#[inline]
pub fn flatten(v: &Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
        .try_normalize(DIST_EPS)
        .unwrap_or_else(na::Vector3::zeros)
}

/// Projection of `v` onto `onto` (zero when `onto` is degenerate).
#[inline]
pub fn project(v: &Vec3, onto: &Vec3) -> Vec3 {
    let len_sq = onto.norm_squared();
    if len_sq <= DIST_EPS * DIST_EPS {
        return Vec3::zeros();
    }
    onto * (v.dot(onto) / len_sq)
}
