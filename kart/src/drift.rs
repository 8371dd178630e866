//! Drift state machine.
//!
//! A drift starts when a kart lands from a hop with the hop button still held and its heading
//! turned away from its velocity by a moderate angle. While drifting the kart keeps that angle
//! as a yaw offset between its orientation and its velocity frame, and steering is forced
//! toward the inside of the turn.

use crate::{
    collision::{Quat, Vec3},
    math::{flatten, rotate_towards, signed_angle, yaw},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriftState {
    #[default]
    NotDrifting,
    /// Velocity points to the kart's right; the kart steers left.
    FacingLeft,
    /// Velocity points to the kart's left; the kart steers right.
    FacingRight,
}

/// Drift tuning, in degrees and degrees per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftSettings {
    pub min_start_angle: f32,
    pub max_start_angle: f32,
    pub min_drifting_steering: f32,
    pub rotation_correction_speed: f32,
}

/// What the kart needs to know to decide whether a drift starts this step.
#[derive(Clone, Copy, Debug)]
pub struct Landing {
    pub hop_held: bool,
    pub has_control: bool,
    pub currently_grounded: bool,
    pub grounded_next: bool,
}

impl Landing {
    #[inline]
    fn is_edge(&self) -> bool {
        self.hop_held && self.has_control && !self.currently_grounded && self.grounded_next
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drift {
    pub state: DriftState,
    /// Yaw between the kart's orientation and its velocity frame.
    pub offset: Quat,
}

impl Default for Drift {
    fn default() -> Self {
        Self {
            state: DriftState::NotDrifting,
            offset: Quat::identity(),
        }
    }
}

impl Drift {
    #[inline]
    pub fn is_drifting(&self) -> bool {
        self.state != DriftState::NotDrifting
    }

    /// Try to enter a drift on landing. Returns true when a drift started.
    pub fn try_start(
        &mut self,
        settings: &DriftSettings,
        landing: &Landing,
        rotation: &Quat,
        velocity: &Vec3,
    ) -> bool {
        if self.is_drifting() || !landing.is_edge() {
            return false;
        }
        let forward = flatten(&(rotation * Vec3::z()));
        let heading = flatten(velocity);
        let Some((state, angle)) = classify(settings, signed_angle(&forward, &heading, &Vec3::y()))
        else {
            return false;
        };
        self.state = state;
        self.offset = yaw(angle);
        log::debug!("drift started {:?} at {:.1} degrees", state, angle);
        true
    }

    /// End the drift when hop is released or control is lost, and ease the offset back.
    ///
    /// Returns true only on the step the drift actually ends.
    pub fn update_stop(
        &mut self,
        settings: &DriftSettings,
        hop_held: bool,
        has_control: bool,
        dt: f32,
    ) -> bool {
        if hop_held && has_control {
            return false;
        }
        let was_drifting = self.is_drifting();
        self.offset = rotate_towards(
            self.offset,
            Quat::identity(),
            settings.rotation_correction_speed * dt,
        );
        self.state = DriftState::NotDrifting;
        if was_drifting {
            log::debug!("drift ended");
        }
        was_drifting
    }

    /// Force the steering input toward the inside of the drift.
    pub fn clamp_steering(&self, settings: &DriftSettings, steering: f32) -> f32 {
        let min = settings.min_drifting_steering;
        match self.state {
            DriftState::NotDrifting => steering,
            DriftState::FacingLeft => steering.clamp(-1.0, -min),
            DriftState::FacingRight => steering.clamp(min, 1.0),
        }
    }

    /// Leave the drift state without touching the offset.
    #[inline]
    pub fn cancel(&mut self) {
        self.state = DriftState::NotDrifting;
    }
}

/// Drift direction for a heading-to-velocity angle, if the angle is in the start window.
fn classify(settings: &DriftSettings, angle: f32) -> Option<(DriftState, f32)> {
    let (min, max) = (settings.min_start_angle, settings.max_start_angle);
    if angle > min && angle < max {
        Some((DriftState::FacingLeft, angle))
    } else if angle < -min && angle > -max {
        Some((DriftState::FacingRight, angle))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        DEFAULT_MAX_DRIFT_START_ANGLE, DEFAULT_MIN_DRIFT_START_ANGLE,
        DEFAULT_MIN_DRIFTING_STEERING, DEFAULT_ROTATION_CORRECTION_SPEED,
    };

    fn settings() -> DriftSettings {
        DriftSettings {
            min_start_angle: DEFAULT_MIN_DRIFT_START_ANGLE,
            max_start_angle: DEFAULT_MAX_DRIFT_START_ANGLE,
            min_drifting_steering: DEFAULT_MIN_DRIFTING_STEERING,
            rotation_correction_speed: DEFAULT_ROTATION_CORRECTION_SPEED,
        }
    }

    const LANDING: Landing = Landing {
        hop_held: true,
        has_control: true,
        currently_grounded: false,
        grounded_next: true,
    };

    fn velocity_at(degrees: f32) -> Vec3 {
        let a = degrees.to_radians();
        Vec3::new(a.sin(), 0.0, a.cos()) * 8.0
    }

    fn land_with(degrees: f32) -> Drift {
        let mut drift = Drift::default();
        drift.try_start(&settings(), &LANDING, &Quat::identity(), &velocity_at(degrees));
        drift
    }

    #[test]
    fn positive_angle_faces_left() {
        let drift = land_with(30.0);
        assert_eq!(drift.state, DriftState::FacingLeft);
        assert!(drift.offset.angle_to(&yaw(30.0)) < 1.0e-4);
    }

    #[test]
    fn negative_angle_faces_right() {
        let drift = land_with(-30.0);
        assert_eq!(drift.state, DriftState::FacingRight);
        assert!(drift.offset.angle_to(&yaw(-30.0)) < 1.0e-4);
    }

    #[test]
    fn angles_outside_the_window_do_not_drift() {
        assert_eq!(land_with(10.0), Drift::default());
        assert_eq!(land_with(95.0), Drift::default());
        assert_eq!(land_with(-95.0), Drift::default());
        assert_eq!(land_with(0.0), Drift::default());
    }

    #[test]
    fn no_drift_without_landing_edge() {
        let s = settings();
        let mut drift = Drift::default();
        let already_grounded = Landing {
            currently_grounded: true,
            ..LANDING
        };
        assert!(!drift.try_start(&s, &already_grounded, &Quat::identity(), &velocity_at(30.0)));

        let released = Landing {
            hop_held: false,
            ..LANDING
        };
        assert!(!drift.try_start(&s, &released, &Quat::identity(), &velocity_at(30.0)));
        assert!(!drift.is_drifting());
    }

    #[test]
    fn stop_fires_once_and_eases_offset() {
        let s = settings();
        let mut drift = land_with(30.0);

        assert!(!drift.update_stop(&s, true, true, 0.1));
        assert!(drift.is_drifting());

        assert!(drift.update_stop(&s, false, true, 0.1));
        assert_eq!(drift.state, DriftState::NotDrifting);
        // 30 degrees at 180 deg/s: 18 degrees removed in 0.1 s.
        assert!((drift.offset.angle().to_degrees() - 12.0).abs() < 1.0e-2);

        assert!(!drift.update_stop(&s, false, true, 0.1));
        assert!(drift.offset.angle() < 1.0e-4);
    }

    #[test]
    fn steering_is_forced_inside_the_turn() {
        let s = settings();
        let left = land_with(30.0);
        assert_eq!(left.clamp_steering(&s, 1.0), -s.min_drifting_steering);
        assert_eq!(left.clamp_steering(&s, -0.7), -0.7);

        let right = land_with(-30.0);
        assert_eq!(right.clamp_steering(&s, -1.0), s.min_drifting_steering);

        assert_eq!(Drift::default().clamp_steering(&s, 0.3), 0.3);
    }
}
