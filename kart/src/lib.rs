//! Kinematic kart movement: ground probing, driving, drifting, collisions and lap timing.
//!
//! A [`Kart`] owns its state and advances with [`Kart::step`] against any
//! [`CollisionQuery`] backend. [`Simulation`] steps many karts in a [`CollisionWorld`] and
//! feeds checkpoint crossings to a [`TrackManager`].

pub mod collision;
pub mod config;
pub mod constants;
pub mod drift;
pub mod error;
pub mod events;
pub mod ground;
pub mod input;
pub mod integrator;
pub mod kart;
pub mod layers;
pub mod math;
pub mod penetration;
pub mod race;
pub mod response;
pub mod simulation;
pub mod stats;

pub use collision::{
    CapsuleSpec, ColliderDef, ColliderShapeDef, CollisionQuery, CollisionWorld, KartId, Quat,
    QueryFilter, Transform, Vec3,
};
pub use config::KartConfig;
pub use drift::DriftState;
pub use error::{KartError, KartResult};
pub use events::KartEvent;
pub use ground::GroundInfo;
pub use input::{InputState, KartInput};
pub use kart::{Kart, KartState, StepOutput};
pub use layers::{CollisionLayer, LayerMask};
pub use race::{Checkpoint, CheckpointId, RaceUpdate, Racer, TrackManager, TrackRecord};
pub use response::{KartCollider, KartInfo};
pub use simulation::{Simulation, TickReport};
pub use stats::{KartModifier, KartStats, ModifierHandle, StatModifier};
