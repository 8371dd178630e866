//! Kart statistics and the modifiers that shape them.
//!
//! A kart's effective stats are recomputed every step by folding its base stats through an
//! ordered list of modifiers. Each modifier sees the result of the previous one.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// The scalar statistics driving a kart's movement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KartStats {
    /// Rate of forward speed gain under full throttle (m/s²).
    pub acceleration: f32,
    /// Rate of forward speed loss under full brake (m/s²).
    pub braking: f32,
    /// Rate of speed loss with no throttle input (m/s²).
    pub coasting_drag: f32,
    /// Downward acceleration while the capsule is not touching ground (m/s²).
    pub gravity: f32,
    /// Rate at which sideways velocity is removed while grounded (m/s²).
    pub grip: f32,
    /// Upward velocity added by a hop (m/s).
    pub hop_height: f32,
    /// Rate of reverse speed gain (m/s²).
    pub reverse_acceleration: f32,
    /// Maximum reverse speed (m/s).
    pub reverse_speed: f32,
    /// Maximum forward speed (m/s).
    pub top_speed: f32,
    /// Yaw rate at full steering (degrees/s).
    pub turn_speed: f32,
    /// Used to resolve kart-to-kart collisions.
    pub weight: f32,
}

impl Default for KartStats {
    fn default() -> Self {
        Self {
            acceleration: 5.0,
            braking: 10.0,
            coasting_drag: 4.0,
            gravity: 20.0,
            grip: 15.0,
            hop_height: 3.0,
            reverse_acceleration: 5.0,
            reverse_speed: 5.0,
            top_speed: 10.0,
            turn_speed: 100.0,
            weight: 1.0,
        }
    }
}

impl KartStats {
    /// Every stat set to `value`. `splat(0.0)` is the additive identity, `splat(1.0)` the
    /// multiplicative one.
    pub const fn splat(value: f32) -> Self {
        Self {
            acceleration: value,
            braking: value,
            coasting_drag: value,
            gravity: value,
            grip: value,
            hop_height: value,
            reverse_acceleration: value,
            reverse_speed: value,
            top_speed: value,
            turn_speed: value,
            weight: value,
        }
    }

    /// Combine two stat blocks field by field.
    pub fn zip_with(&self, other: &KartStats, f: impl Fn(f32, f32) -> f32) -> KartStats {
        KartStats {
            acceleration: f(self.acceleration, other.acceleration),
            braking: f(self.braking, other.braking),
            coasting_drag: f(self.coasting_drag, other.coasting_drag),
            gravity: f(self.gravity, other.gravity),
            grip: f(self.grip, other.grip),
            hop_height: f(self.hop_height, other.hop_height),
            reverse_acceleration: f(self.reverse_acceleration, other.reverse_acceleration),
            reverse_speed: f(self.reverse_speed, other.reverse_speed),
            top_speed: f(self.top_speed, other.top_speed),
            turn_speed: f(self.turn_speed, other.turn_speed),
            weight: f(self.weight, other.weight),
        }
    }

    /// Fold `base` through `modifiers` in order.
    pub fn modified<'a>(
        base: &KartStats,
        modifiers: impl IntoIterator<Item = &'a KartModifier>,
    ) -> KartStats {
        modifiers
            .into_iter()
            .fold(*base, |stats, modifier| modifier.apply(&stats))
    }
}

/// Anything able to transform the eleven kart stats.
///
/// Every method defaults to the identity, so implementors override only the stats they touch.
pub trait StatModifier: Send + Sync {
    fn modify_acceleration(&self, acceleration: f32) -> f32 {
        acceleration
    }
    fn modify_braking(&self, braking: f32) -> f32 {
        braking
    }
    fn modify_coasting_drag(&self, coasting_drag: f32) -> f32 {
        coasting_drag
    }
    fn modify_gravity(&self, gravity: f32) -> f32 {
        gravity
    }
    fn modify_grip(&self, grip: f32) -> f32 {
        grip
    }
    fn modify_hop_height(&self, hop_height: f32) -> f32 {
        hop_height
    }
    fn modify_reverse_acceleration(&self, reverse_acceleration: f32) -> f32 {
        reverse_acceleration
    }
    fn modify_reverse_speed(&self, reverse_speed: f32) -> f32 {
        reverse_speed
    }
    fn modify_top_speed(&self, top_speed: f32) -> f32 {
        top_speed
    }
    fn modify_turn_speed(&self, turn_speed: f32) -> f32 {
        turn_speed
    }
    fn modify_weight(&self, weight: f32) -> f32 {
        weight
    }

    /// Apply all eleven transforms.
    fn apply(&self, s: &KartStats) -> KartStats {
        KartStats {
            acceleration: self.modify_acceleration(s.acceleration),
            braking: self.modify_braking(s.braking),
            coasting_drag: self.modify_coasting_drag(s.coasting_drag),
            gravity: self.modify_gravity(s.gravity),
            grip: self.modify_grip(s.grip),
            hop_height: self.modify_hop_height(s.hop_height),
            reverse_acceleration: self.modify_reverse_acceleration(s.reverse_acceleration),
            reverse_speed: self.modify_reverse_speed(s.reverse_speed),
            top_speed: self.modify_top_speed(s.top_speed),
            turn_speed: self.modify_turn_speed(s.turn_speed),
            weight: self.modify_weight(s.weight),
        }
    }
}

/// A single entry of a kart's modifier list.
#[derive(Clone)]
pub enum KartModifier {
    /// Leaves every stat unchanged.
    Default,
    /// Adds the given values to the current stats.
    Additive(KartStats),
    /// Multiplies the current stats by the given values.
    Multiplicative(KartStats),
    /// Multiplies the current stats while the kart is off the ground.
    Airborne(KartStats),
    /// A modifier supplied from outside the crate.
    Provided(Arc<dyn StatModifier>),
}

impl fmt::Debug for KartModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Additive(s) => f.debug_tuple("Additive").field(s).finish(),
            Self::Multiplicative(s) => f.debug_tuple("Multiplicative").field(s).finish(),
            Self::Airborne(s) => f.debug_tuple("Airborne").field(s).finish(),
            Self::Provided(_) => write!(f, "Provided(..)"),
        }
    }
}

impl KartModifier {
    pub fn apply(&self, stats: &KartStats) -> KartStats {
        match self {
            Self::Default => *stats,
            Self::Additive(delta) => stats.zip_with(delta, |a, b| a + b),
            Self::Multiplicative(factor) | Self::Airborne(factor) => {
                stats.zip_with(factor, |a, b| a * b)
            }
            Self::Provided(provider) => provider.apply(stats),
        }
    }
}

/// Handle of a persistent modifier, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModifierHandle(u32);

/// The ordered modifiers of one kart.
///
/// Composition order: persistent entries (insertion order), then the airborne modifier while
/// it is active, then this step's transient entries.
#[derive(Clone, Debug, Default)]
pub struct ModifierStack {
    persistent: Vec<(ModifierHandle, KartModifier)>,
    airborne: Option<KartModifier>,
    airborne_active: bool,
    /// Scratch list rebuilt every step from collision pickups.
    transient: Vec<KartModifier>,
    next_handle: u32,
}

impl ModifierStack {
    pub fn new(airborne: Option<KartModifier>) -> Self {
        Self {
            airborne,
            ..Self::default()
        }
    }

    /// Append a modifier that stays until removed (kart body, driver, timed boost).
    pub fn add(&mut self, modifier: KartModifier) -> ModifierHandle {
        let handle = ModifierHandle(self.next_handle);
        self.next_handle += 1;
        self.persistent.push((handle, modifier));
        handle
    }

    pub fn remove(&mut self, handle: ModifierHandle) -> Option<KartModifier> {
        let index = self.persistent.iter().position(|(h, _)| *h == handle)?;
        Some(self.persistent.remove(index).1)
    }

    /// Turn the airborne modifier on or off. Returns true when the state changed.
    pub fn set_airborne(&mut self, airborne: bool) -> bool {
        if self.airborne.is_none() || self.airborne_active == airborne {
            return false;
        }
        self.airborne_active = airborne;
        true
    }

    /// Add a modifier for the next computation only.
    pub fn push_transient(&mut self, modifier: KartModifier) {
        self.transient.push(modifier);
    }

    pub fn clear_transient(&mut self) {
        self.transient.clear();
    }

    /// Compose the effective stats from `base`.
    pub fn compute(&self, base: &KartStats) -> KartStats {
        let airborne = self.airborne.iter().filter(|_| self.airborne_active);
        KartStats::modified(
            base,
            self.persistent
                .iter()
                .map(|(_, m)| m)
                .chain(airborne)
                .chain(self.transient.iter()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KartStats {
        KartStats {
            acceleration: 3.0,
            braking: 7.5,
            coasting_drag: 1.25,
            gravity: 18.0,
            grip: 4.0,
            hop_height: 2.5,
            reverse_acceleration: 6.0,
            reverse_speed: 4.0,
            top_speed: 12.0,
            turn_speed: 90.0,
            weight: 8.0,
        }
    }

    #[test]
    fn additive_zero_is_noop() {
        let base = sample();
        let out = KartModifier::Additive(KartStats::splat(0.0)).apply(&base);
        assert_eq!(out, base);
    }

    #[test]
    fn multiplicative_one_is_noop() {
        let base = sample();
        assert_eq!(KartModifier::Multiplicative(KartStats::splat(1.0)).apply(&base), base);
        assert_eq!(KartModifier::Airborne(KartStats::splat(1.0)).apply(&base), base);
        assert_eq!(KartModifier::Default.apply(&base), base);
    }

    #[test]
    fn modifiers_compose_left_to_right() {
        let base = KartStats::splat(2.0);
        let add = KartModifier::Additive(KartStats::splat(1.0));
        let mul = KartModifier::Multiplicative(KartStats::splat(3.0));

        assert_eq!(KartStats::modified(&base, [&add, &mul]).top_speed, 9.0);
        assert_eq!(KartStats::modified(&base, [&mul, &add]).top_speed, 7.0);
    }

    struct DoubleTopSpeed;

    impl StatModifier for DoubleTopSpeed {
        fn modify_top_speed(&self, top_speed: f32) -> f32 {
            top_speed * 2.0
        }
    }

    #[test]
    fn provided_modifier_touches_only_overridden_stats() {
        let base = sample();
        let out = KartModifier::Provided(Arc::new(DoubleTopSpeed)).apply(&base);
        assert_eq!(out.top_speed, 24.0);
        assert_eq!(out.weight, base.weight);
        assert_eq!(out.turn_speed, base.turn_speed);
    }

    #[test]
    fn stack_removes_by_handle_and_clears_transients() {
        let mut stack = ModifierStack::new(None);
        let boost = stack.add(KartModifier::Additive(KartStats {
            top_speed: 5.0,
            ..KartStats::splat(0.0)
        }));
        stack.push_transient(KartModifier::Multiplicative(KartStats {
            top_speed: 2.0,
            ..KartStats::splat(1.0)
        }));

        let base = sample();
        assert_eq!(stack.compute(&base).top_speed, (12.0 + 5.0) * 2.0);

        stack.clear_transient();
        assert_eq!(stack.compute(&base).top_speed, 17.0);

        assert!(stack.remove(boost).is_some());
        assert!(stack.remove(boost).is_none());
        assert_eq!(stack.compute(&base), base);
    }

    #[test]
    fn airborne_modifier_applies_only_while_active() {
        let mut stack = ModifierStack::new(Some(KartModifier::Airborne(KartStats {
            turn_speed: 0.5,
            ..KartStats::splat(1.0)
        })));
        let base = sample();

        assert_eq!(stack.compute(&base).turn_speed, 90.0);
        assert!(stack.set_airborne(true));
        assert!(!stack.set_airborne(true));
        assert_eq!(stack.compute(&base).turn_speed, 45.0);
        assert!(stack.set_airborne(false));
        assert_eq!(stack.compute(&base).turn_speed, 90.0);
    }
}
