//! Velocity and orientation integration for one kart step.
//!
//! Velocity is integrated in the kart's local frame: `x` is sideways, `y` up and `z` forward,
//! measured in the frame rotated by both the kart orientation and its drift offset.

use crate::{
    collision::{Quat, Vec3},
    constants::{AUTO_BRAKE_SPEED, DIST_EPS, GROUND_ALIGN_BLEND_DEGREES, INPUT_DEADZONE},
    drift::{Drift, DriftSettings},
    ground::GroundInfo,
    math::{from_to_rotation, move_towards, project, rotate_towards, yaw},
    stats::KartStats,
};

/// `velocity` expressed in the frame of `rotation` followed by `drift_offset`.
#[inline]
pub fn local_velocity(rotation: &Quat, drift_offset: &Quat, velocity: &Vec3) -> Vec3 {
    rotation.inverse() * (drift_offset.inverse() * velocity)
}

/// Throttle actually applied. Without control the kart brakes to a stop on its own.
#[inline]
pub fn effective_throttle(has_control: bool, input: f32, local_forward_speed: f32) -> f32 {
    if has_control {
        input
    } else if local_forward_speed > AUTO_BRAKE_SPEED {
        -1.0
    } else {
        0.0
    }
}

/// Forward speed after one step of throttle, braking, reverse or coasting.
pub fn forward_speed(stats: &KartStats, throttle: f32, speed: f32, dt: f32) -> f32 {
    if throttle > -INPUT_DEADZONE && throttle < INPUT_DEADZONE {
        move_towards(speed, 0.0, stats.coasting_drag * dt)
    } else if throttle > INPUT_DEADZONE {
        move_towards(speed, stats.top_speed, throttle * stats.acceleration * dt)
    } else if speed > INPUT_DEADZONE {
        move_towards(speed, 0.0, -throttle * stats.braking * dt)
    } else {
        move_towards(
            speed,
            -stats.reverse_speed,
            -throttle * stats.reverse_acceleration * dt,
        )
    }
}

/// Inputs of [`driving_velocity`] that do not change within a step.
#[derive(Clone, Copy, Debug)]
pub struct Drive<'a> {
    pub stats: &'a KartStats,
    pub ground: &'a GroundInfo,
    pub has_control: bool,
    pub throttle_input: f32,
    pub dt: f32,
}

/// New world velocity after grip, throttle and gravity.
pub fn driving_velocity(
    drive: &Drive<'_>,
    rotation: &Quat,
    drift_offset: &Quat,
    velocity: &Vec3,
) -> Vec3 {
    let Drive {
        stats, ground, dt, ..
    } = *drive;
    let mut local = local_velocity(rotation, drift_offset, velocity);

    if ground.is_grounded {
        local.x = move_towards(local.x, 0.0, stats.grip * dt);
        let throttle = effective_throttle(drive.has_control, drive.throttle_input, local.z);
        local.z = forward_speed(stats, throttle, local.z, dt);
    }

    if ground.is_capsule_touching {
        local.y = local.y.max(0.0);
    }

    let mut world = drift_offset * (rotation * local);
    if !ground.is_capsule_touching {
        world.y -= stats.gravity * dt;
    }
    world
}

/// Upward velocity added by a hop, along the kart's up axis.
#[inline]
pub fn hop_impulse(rotation: &Quat, hop_height: f32) -> Vec3 {
    rotation * Vec3::y() * hop_height
}

/// Steering applied to the rotation being built this step.
#[derive(Clone, Copy, Debug)]
pub struct Steer<'a> {
    pub turn_speed: f32,
    pub steering_input: f32,
    pub has_control: bool,
    pub drift: &'a Drift,
    pub drift_settings: &'a DriftSettings,
    pub dt: f32,
}

/// Yaw `rotation` by the steering input.
///
/// Steering flips when reversing, is zero without control, is forced inside the turn while
/// drifting and has no effect while the kart is standing still.
pub fn steer(steer: &Steer<'_>, rotation: &Quat, velocity: &Vec3) -> Quat {
    let local = local_velocity(rotation, &steer.drift.offset, velocity);
    let direction = if local.z < 0.0 { -1.0 } else { 1.0 };
    let steering = if steer.has_control {
        steer.steering_input * direction
    } else {
        0.0
    };
    let steering = steer.drift.clamp_steering(steer.drift_settings, steering);

    let moving = if velocity.norm_squared() > 0.0 { 1.0 } else { 0.0 };
    let turn = steer.turn_speed * steering * moving * steer.dt;
    rotation * yaw(turn)
}

/// Tilt `rotation` so the kart's up follows the ground.
///
/// `body` is the committed kart rotation the ground targets are measured from. Near the
/// ground the tilt is blended between the current and upcoming surfaces; in the air the kart
/// slowly rotates toward the upcoming surface at `airborne_speed` degrees per second.
pub fn align_to_ground(
    body: &Quat,
    rotation: &Quat,
    current: &GroundInfo,
    next: &GroundInfo,
    airborne_speed: f32,
    dt: f32,
) -> Quat {
    let up = body * Vec3::y();
    let current_target = from_to_rotation(&up, &current.normal);
    let next_target = from_to_rotation(&up, &next.normal);

    if next.is_close_to_ground {
        rotate_towards(current_target, next_target, GROUND_ALIGN_BLEND_DEGREES) * rotation
    } else {
        rotate_towards(*rotation, next_target * rotation, airborne_speed * dt)
    }
}

/// Stop velocity from driving the kart back into what the penetration offset pushes it out
/// of, without reversing it. Returns this step's movement.
pub fn adjust_velocity_by_penetration(velocity: &mut Vec3, offset: &mut Vec3, dt: f32) -> Vec3 {
    if dt <= DIST_EPS {
        return *offset;
    }
    let projection = project(&(*velocity * dt), offset);
    if offset.dot(&projection) < 0.0 {
        if offset.norm_squared() > projection.norm_squared() {
            *velocity -= projection / dt;
            *offset += projection;
        } else {
            *velocity += *offset / dt;
            *offset = Vec3::zeros();
        }
    }
    *velocity * dt + *offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftState;

    const DT: f32 = 1.0 / 60.0;

    fn grounded() -> GroundInfo {
        GroundInfo {
            normal: Vec3::y(),
            is_grounded: true,
            is_capsule_touching: true,
            is_close_to_ground: true,
        }
    }

    fn drive<'a>(stats: &'a KartStats, ground: &'a GroundInfo, throttle: f32) -> Drive<'a> {
        Drive {
            stats,
            ground,
            has_control: true,
            throttle_input: throttle,
            dt: DT,
        }
    }

    #[test]
    fn full_throttle_accelerates_monotonically_to_top_speed() {
        let stats = KartStats::default();
        let ground = grounded();
        let d = drive(&stats, &ground, 1.0);
        let mut velocity = Vec3::zeros();
        let mut last = 0.0;

        for _ in 0..600 {
            velocity = driving_velocity(&d, &Quat::identity(), &Quat::identity(), &velocity);
            assert!(velocity.z >= last);
            assert!(velocity.z <= stats.top_speed);
            last = velocity.z;
        }
        assert!((last - stats.top_speed).abs() < 1.0e-4);
    }

    #[test]
    fn coasting_decays_without_changing_sign() {
        let stats = KartStats::default();
        let ground = grounded();
        let d = drive(&stats, &ground, 0.0);

        for start in [6.0, -3.0] {
            let mut velocity = Vec3::new(0.0, 0.0, start);
            for _ in 0..200 {
                let next = driving_velocity(&d, &Quat::identity(), &Quat::identity(), &velocity);
                assert!(next.z.abs() <= velocity.z.abs());
                assert!(next.z == 0.0 || next.z.signum() == start.signum());
                velocity = next;
            }
            assert_eq!(velocity.z, 0.0);
        }
    }

    #[test]
    fn braking_stops_before_reversing() {
        let stats = KartStats::default();
        let moving = forward_speed(&stats, -1.0, 5.0, 0.1);
        assert!((moving - 4.0).abs() < 1.0e-5);

        let stopped = forward_speed(&stats, -1.0, 0.0, 0.1);
        assert!((stopped + 0.5).abs() < 1.0e-5);
        assert_eq!(forward_speed(&stats, -1.0, -4.9, 1.0), -stats.reverse_speed);
    }

    #[test]
    fn uncontrolled_kart_brakes_itself() {
        assert_eq!(effective_throttle(false, 1.0, 3.0), -1.0);
        assert_eq!(effective_throttle(false, 1.0, 0.01), 0.0);
        assert_eq!(effective_throttle(true, 0.4, 3.0), 0.4);
    }

    #[test]
    fn grip_removes_sideways_slide() {
        let stats = KartStats::default();
        let ground = grounded();
        let d = drive(&stats, &ground, 0.0);
        let v = driving_velocity(&d, &Quat::identity(), &Quat::identity(), &(Vec3::x() * 2.0));
        assert!((v.x - (2.0 - stats.grip * DT)).abs() < 1.0e-5);
    }

    #[test]
    fn gravity_applies_only_when_not_touching() {
        let stats = KartStats::default();
        let air = GroundInfo::default();
        let d = drive(&stats, &air, 1.0);
        let v = driving_velocity(&d, &Quat::identity(), &Quat::identity(), &(Vec3::z() * 4.0));
        assert!((v.y + stats.gravity * DT).abs() < 1.0e-5);
        // No throttle response in the air.
        assert!((v.z - 4.0).abs() < 1.0e-5);

        let ground = grounded();
        let d = drive(&stats, &ground, 0.0);
        let v = driving_velocity(&d, &Quat::identity(), &Quat::identity(), &(Vec3::y() * -2.0));
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn drift_frame_preserves_velocity_direction() {
        let stats = KartStats {
            grip: 0.0,
            coasting_drag: 0.0,
            ..KartStats::default()
        };
        let ground = grounded();
        let d = drive(&stats, &ground, 0.0);
        let velocity = Vec3::new(3.0, 0.0, 3.0);
        let v = driving_velocity(&d, &Quat::identity(), &yaw(45.0), &velocity);
        assert!((v - velocity).norm() < 1.0e-4);
    }

    fn steer_input<'a>(drift: &'a Drift, settings: &'a DriftSettings, input: f32) -> Steer<'a> {
        Steer {
            turn_speed: 90.0,
            steering_input: input,
            has_control: true,
            drift,
            drift_settings: settings,
            dt: 1.0,
        }
    }

    fn drift_settings() -> DriftSettings {
        DriftSettings {
            min_start_angle: 15.0,
            max_start_angle: 90.0,
            min_drifting_steering: 0.2,
            rotation_correction_speed: 180.0,
        }
    }

    #[test]
    fn steering_turns_toward_plus_x_and_flips_in_reverse() {
        let drift = Drift::default();
        let settings = drift_settings();
        let s = steer_input(&drift, &settings, 0.5);

        let forward = steer(&s, &Quat::identity(), &Vec3::new(0.0, 0.0, 5.0));
        assert!((forward.angle_to(&yaw(45.0))) < 1.0e-4);

        let reverse = steer(&s, &Quat::identity(), &Vec3::new(0.0, 0.0, -5.0));
        assert!((reverse.angle_to(&yaw(-45.0))) < 1.0e-4);

        let still = steer(&s, &Quat::identity(), &Vec3::zeros());
        assert_eq!(still, Quat::identity());
    }

    #[test]
    fn drifting_left_forces_left_turn() {
        let drift = Drift {
            state: DriftState::FacingLeft,
            offset: yaw(30.0),
        };
        let settings = drift_settings();
        let s = steer_input(&drift, &settings, 1.0);
        let turned = steer(&s, &Quat::identity(), &Vec3::new(0.0, 0.0, 5.0));
        assert!(turned.angle_to(&yaw(-18.0)) < 1.0e-4);
    }

    #[test]
    fn airborne_alignment_levels_out_gradually() {
        let tilted = Quat::from_axis_angle(&Vec3::x_axis(), 40.0f32.to_radians());
        let air = GroundInfo::default();
        let aligned = align_to_ground(&tilted, &tilted, &air, &air, 60.0, 0.5);
        let up = aligned * Vec3::y();
        let tilt = up.angle(&Vec3::y()).to_degrees();
        assert!((tilt - 10.0).abs() < 1.0e-2);
    }

    #[test]
    fn grounded_alignment_keeps_level_kart_level() {
        let ground = grounded();
        let rotation = yaw(30.0);
        let aligned = align_to_ground(&rotation, &rotation, &ground, &ground, 60.0, DT);
        assert!(aligned.angle_to(&rotation) < 1.0e-4);
    }

    #[test]
    fn opposing_velocity_is_trimmed_by_penetration() {
        // Offset larger than the inward motion: motion into the wall is removed.
        let mut velocity = Vec3::new(0.0, 0.0, -6.0);
        let mut offset = Vec3::new(0.0, 0.0, 0.2);
        let movement = adjust_velocity_by_penetration(&mut velocity, &mut offset, 0.01);
        assert!(velocity.norm() < 1.0e-5);
        assert!((offset.z - 0.14).abs() < 1.0e-5);
        assert!((movement - offset).norm() < 1.0e-6);

        // Offset smaller: only the offset's worth of velocity is removed.
        let mut velocity = Vec3::new(0.0, 0.0, -60.0);
        let mut offset = Vec3::new(0.0, 0.0, 0.2);
        let movement = adjust_velocity_by_penetration(&mut velocity, &mut offset, 0.01);
        assert!((velocity.z + 40.0).abs() < 1.0e-3);
        assert_eq!(offset, Vec3::zeros());
        assert!((movement.z + 0.4).abs() < 1.0e-5);
    }

    #[test]
    fn aligned_velocity_is_untouched_by_penetration() {
        let mut velocity = Vec3::new(1.0, 0.0, 0.0);
        let mut offset = Vec3::new(0.0, 0.1, 0.0);
        let movement = adjust_velocity_by_penetration(&mut velocity, &mut offset, 0.5);
        assert_eq!(velocity, Vec3::new(1.0, 0.0, 0.0));
        assert!((movement - Vec3::new(0.5, 0.1, 0.0)).norm() < 1.0e-6);
    }
}
