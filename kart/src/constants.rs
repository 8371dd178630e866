/*!
Kart solver constants and tuning defaults.

These constants centralize the parameters used by the ground probes, the penetration
solver, the velocity integrator and the drift logic. Per-kart overrides come from
[`KartConfig`](crate::config::KartConfig); the values here are its defaults.

Notes
- Distances are in meters, time in seconds, angles in degrees, angular rates in degrees
  per second.
*/

/// Number of penetration solve iterations per step.
pub const MAX_PENETRATION_SOLVES: usize = 3;

/// Extra separation kept from surfaces when resolving overlaps (meters).
pub const CONTACT_OFFSET: f32 = 0.01;

/// Clearance between "capsule touching" and "grounded" probe distances (meters).
pub const GROUND_TO_CAPSULE_OFFSET: f32 = 0.025;

/// Acceleration input magnitude below which the driver counts as coasting.
pub const INPUT_DEADZONE: f32 = 0.01;

/// Forward speed above which a kart without control auto-brakes (m/s).
pub const AUTO_BRAKE_SPEED: f32 = 0.05;

/// A grounded classification is dropped when `dot(normal, velocity_dir)` exceeds this.
pub const VELOCITY_NORMAL_AIRBORNE_DOT: f32 = 0.5;

/// Max angle per step between current and next ground alignment while near the ground.
pub const GROUND_ALIGN_BLEND_DEGREES: f32 = 0.5;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Margin added to broad-phase bounds so near misses still reach the narrow phase.
pub const BROAD_PHASE_MARGIN: f32 = 0.05;

/// How fast the kart levels out when airborne.
pub const DEFAULT_AIRBORNE_ORIENTATION_SPEED: f32 = 60.0;

/// Minimum steering magnitude while drifting.
pub const DEFAULT_MIN_DRIFTING_STEERING: f32 = 0.2;

/// How fast the kart's rotation and drift offset are corrected.
pub const DEFAULT_ROTATION_CORRECTION_SPEED: f32 = 180.0;

/// Smallest heading-vs-velocity angle that starts a drift on landing.
pub const DEFAULT_MIN_DRIFT_START_ANGLE: f32 = 15.0;

/// Largest heading-vs-velocity angle that starts a drift on landing.
pub const DEFAULT_MAX_DRIFT_START_ANGLE: f32 = 90.0;

/// Velocity change added on kart-to-kart contact on top of the weight difference.
pub const DEFAULT_KART_TO_KART_BUMP: f32 = 10.0;

/// Default kart capsule radius (meters).
pub const DEFAULT_CAPSULE_RADIUS: f32 = 0.5;

/// Default kart capsule half segment length along forward (meters).
pub const DEFAULT_CAPSULE_HALF_HEIGHT: f32 = 0.5;

/// Minimum number of checkpoints a track should have for lap timing to be meaningful.
pub const RECOMMENDED_MIN_CHECKPOINTS: usize = 3;
