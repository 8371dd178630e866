//! Per-kart configuration, loaded from TOML.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```toml
//! [stats]
//! top_speed = 14.0
//! weight = 3.0
//!
//! [handling]
//! kart_to_kart_bump = 6.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    collision::{CapsuleSpec, Vec3},
    constants::{
        CONTACT_OFFSET, DEFAULT_AIRBORNE_ORIENTATION_SPEED, DEFAULT_CAPSULE_HALF_HEIGHT,
        DEFAULT_CAPSULE_RADIUS, DEFAULT_KART_TO_KART_BUMP, DEFAULT_MAX_DRIFT_START_ANGLE,
        DEFAULT_MIN_DRIFT_START_ANGLE, DEFAULT_MIN_DRIFTING_STEERING,
        DEFAULT_ROTATION_CORRECTION_SPEED,
    },
    drift::DriftSettings,
    error::{KartError, KartResult},
    ground::GroundProbes,
    stats::{KartModifier, KartStats},
};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct KartConfig {
    #[serde(default)]
    pub stats: KartStats,
    /// Multiplicative modifier applied while the kart is off the ground.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airborne_modifier: Option<StatFactors>,
    #[serde(default)]
    pub capsule: CapsuleConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
    #[serde(default)]
    pub handling: HandlingConfig,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CapsuleConfig {
    #[serde(default = "default_capsule_radius")]
    pub radius: f32,
    #[serde(default = "default_capsule_half_height")]
    pub half_height: f32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            radius: default_capsule_radius(),
            half_height: default_capsule_half_height(),
        }
    }
}

/// Per-stat multipliers. Stats left out of the file keep a factor of 1.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct StatFactors {
    pub acceleration: f32,
    pub braking: f32,
    pub coasting_drag: f32,
    pub gravity: f32,
    pub grip: f32,
    pub hop_height: f32,
    pub reverse_acceleration: f32,
    pub reverse_speed: f32,
    pub top_speed: f32,
    pub turn_speed: f32,
    pub weight: f32,
}

impl Default for StatFactors {
    fn default() -> Self {
        KartStats::splat(1.0).into()
    }
}

impl From<KartStats> for StatFactors {
    fn from(s: KartStats) -> Self {
        Self {
            acceleration: s.acceleration,
            braking: s.braking,
            coasting_drag: s.coasting_drag,
            gravity: s.gravity,
            grip: s.grip,
            hop_height: s.hop_height,
            reverse_acceleration: s.reverse_acceleration,
            reverse_speed: s.reverse_speed,
            top_speed: s.top_speed,
            turn_speed: s.turn_speed,
            weight: s.weight,
        }
    }
}

impl From<StatFactors> for KartStats {
    fn from(f: StatFactors) -> Self {
        Self {
            acceleration: f.acceleration,
            braking: f.braking,
            coasting_drag: f.coasting_drag,
            gravity: f.gravity,
            grip: f.grip,
            hop_height: f.hop_height,
            reverse_acceleration: f.reverse_acceleration,
            reverse_speed: f.reverse_speed,
            top_speed: f.top_speed,
            turn_speed: f.turn_speed,
            weight: f.weight,
        }
    }
}

/// Kart-local ground probe origins.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub front: [f32; 3],
    pub right: [f32; 3],
    pub left: [f32; 3],
    pub rear: [f32; 3],
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let p = GroundProbes::default();
        Self {
            front: p.front.into(),
            right: p.right.into(),
            left: p.left.into(),
            rear: p.rear.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct HandlingConfig {
    #[serde(default = "default_airborne_orientation_speed")]
    pub airborne_orientation_speed: f32,
    #[serde(default = "default_min_drifting_steering")]
    pub min_drifting_steering: f32,
    #[serde(default = "default_rotation_correction_speed")]
    pub rotation_correction_speed: f32,
    #[serde(default = "default_min_drift_start_angle")]
    pub min_drift_start_angle: f32,
    #[serde(default = "default_max_drift_start_angle")]
    pub max_drift_start_angle: f32,
    #[serde(default = "default_kart_to_kart_bump")]
    pub kart_to_kart_bump: f32,
    #[serde(default = "default_contact_offset")]
    pub contact_offset: f32,
}

impl Default for HandlingConfig {
    fn default() -> Self {
        Self {
            airborne_orientation_speed: default_airborne_orientation_speed(),
            min_drifting_steering: default_min_drifting_steering(),
            rotation_correction_speed: default_rotation_correction_speed(),
            min_drift_start_angle: default_min_drift_start_angle(),
            max_drift_start_angle: default_max_drift_start_angle(),
            kart_to_kart_bump: default_kart_to_kart_bump(),
            contact_offset: default_contact_offset(),
        }
    }
}

fn default_capsule_radius() -> f32 {
    DEFAULT_CAPSULE_RADIUS
}

fn default_capsule_half_height() -> f32 {
    DEFAULT_CAPSULE_HALF_HEIGHT
}

fn default_airborne_orientation_speed() -> f32 {
    DEFAULT_AIRBORNE_ORIENTATION_SPEED
}

fn default_min_drifting_steering() -> f32 {
    DEFAULT_MIN_DRIFTING_STEERING
}

fn default_rotation_correction_speed() -> f32 {
    DEFAULT_ROTATION_CORRECTION_SPEED
}

fn default_min_drift_start_angle() -> f32 {
    DEFAULT_MIN_DRIFT_START_ANGLE
}

fn default_max_drift_start_angle() -> f32 {
    DEFAULT_MAX_DRIFT_START_ANGLE
}

fn default_kart_to_kart_bump() -> f32 {
    DEFAULT_KART_TO_KART_BUMP
}

fn default_contact_offset() -> f32 {
    CONTACT_OFFSET
}

impl KartConfig {
    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> KartResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| KartError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Save this config to a TOML file.
    pub fn save(&self, path: &Path) -> KartResult<()> {
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|source| KartError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse and validate a config.
    pub fn from_toml_str(text: &str) -> KartResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|source| KartError::ConfigParse { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> KartResult<String> {
        toml::to_string_pretty(self).map_err(|source| KartError::ConfigSerialize { source })
    }

    /// Reject values the solver cannot work with.
    pub fn validate(&self) -> KartResult<()> {
        let invalid = |reason: &str| {
            Err(KartError::InvalidConfiguration {
                reason: reason.to_string(),
            })
        };
        let h = &self.handling;

        if !(self.capsule.radius > 0.0) {
            return invalid("capsule radius must be positive");
        }
        if !(self.capsule.half_height >= 0.0) {
            return invalid("capsule half_height must not be negative");
        }
        if !stats_are_finite(&self.stats)
            || !self
                .airborne_modifier
                .is_none_or(|factors| stats_are_finite(&factors.into()))
        {
            return invalid("kart stats must be finite");
        }
        if !(0.0..=1.0).contains(&h.min_drifting_steering) {
            return invalid("min_drifting_steering must be within [0, 1]");
        }
        if !(h.min_drift_start_angle >= 0.0 && h.min_drift_start_angle < h.max_drift_start_angle)
        {
            return invalid("drift start angles must satisfy 0 <= min < max");
        }
        if !(h.airborne_orientation_speed >= 0.0 && h.rotation_correction_speed >= 0.0) {
            return invalid("rotation speeds must not be negative");
        }
        if !(h.contact_offset >= 0.0) {
            return invalid("contact_offset must not be negative");
        }
        Ok(())
    }

    pub fn capsule_spec(&self) -> CapsuleSpec {
        CapsuleSpec {
            radius: self.capsule.radius,
            half_height: self.capsule.half_height,
        }
    }

    pub fn ground_probes(&self) -> GroundProbes {
        GroundProbes {
            front: Vec3::from(self.probes.front),
            right: Vec3::from(self.probes.right),
            left: Vec3::from(self.probes.left),
            rear: Vec3::from(self.probes.rear),
        }
    }

    pub fn drift_settings(&self) -> DriftSettings {
        DriftSettings {
            min_start_angle: self.handling.min_drift_start_angle,
            max_start_angle: self.handling.max_drift_start_angle,
            min_drifting_steering: self.handling.min_drifting_steering,
            rotation_correction_speed: self.handling.rotation_correction_speed,
        }
    }

    pub fn airborne(&self) -> Option<KartModifier> {
        self.airborne_modifier
            .map(|factors| KartModifier::Airborne(factors.into()))
    }
}

fn stats_are_finite(s: &KartStats) -> bool {
    [
        s.acceleration,
        s.braking,
        s.coasting_drag,
        s.gravity,
        s.grip,
        s.hop_height,
        s.reverse_acceleration,
        s.reverse_speed,
        s.top_speed,
        s.turn_speed,
        s.weight,
    ]
    .iter()
    .all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = KartConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, KartConfig::default());
        assert_eq!(config.stats.top_speed, 10.0);
        assert_eq!(config.handling.kart_to_kart_bump, DEFAULT_KART_TO_KART_BUMP);
        assert!(config.airborne().is_none());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = KartConfig::from_toml_str(
            r#"
            [stats]
            top_speed = 14.0
            weight = 3.0

            [airborne_modifier]
            turn_speed = 0.5

            [handling]
            kart_to_kart_bump = 6.0
            "#,
        )
        .expect("valid config");

        assert_eq!(config.stats.top_speed, 14.0);
        assert_eq!(config.stats.acceleration, KartStats::default().acceleration);
        assert_eq!(config.handling.kart_to_kart_bump, 6.0);
        assert_eq!(config.handling.min_drift_start_angle, DEFAULT_MIN_DRIFT_START_ANGLE);
        let Some(KartModifier::Airborne(factors)) = config.airborne() else {
            panic!("airborne modifier expected");
        };
        assert_eq!(factors.turn_speed, 0.5);
        assert_eq!(factors.top_speed, 1.0);
    }

    #[test]
    fn toml_text_survives_save_format() {
        let mut config = KartConfig::default();
        config.stats.grip = 22.0;
        config.probes.front = [0.0, 0.1, 1.0];
        let text = config.to_toml_string().expect("serialize");
        assert_eq!(KartConfig::from_toml_str(&text).expect("parse"), config);
    }

    #[test]
    fn saved_file_loads_back() {
        let path = std::env::temp_dir().join(format!("kart-config-{}.toml", std::process::id()));
        let mut config = KartConfig::default();
        config.handling.kart_to_kart_bump = 4.0;

        config.save(&path).expect("write config");
        let loaded = KartConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.expect("read config"), config);
    }

    #[test]
    fn rejects_bad_values() {
        let err = KartConfig::from_toml_str("[capsule]\nradius = 0.0").unwrap_err();
        assert!(matches!(err, KartError::InvalidConfiguration { .. }));

        let err = KartConfig::from_toml_str(
            "[handling]\nmin_drift_start_angle = 40.0\nmax_drift_start_angle = 20.0",
        )
        .unwrap_err();
        assert!(matches!(err, KartError::InvalidConfiguration { .. }));

        let err = KartConfig::from_toml_str("[stats]\ntop_speed = \"fast\"").unwrap_err();
        assert!(matches!(err, KartError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = KartConfig::load(Path::new("/nonexistent/kart.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/kart.toml"));
    }
}
