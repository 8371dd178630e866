/*!
Collision root module.

The kart solver only talks to geometry through [`CollisionQuery`]. This module holds that
seam and an in-memory backend built on parry3d:

- types:        shared data types (Transform, CapsuleSpec, hits, ids)
- query:        the query trait and its filter
- broad:        broad-phase helpers (BVH over static colliders, query AABBs)
- narrow_phase: thin wrappers over parry3d queries (rays, overlaps, sweeps, contacts)
- world:        `CollisionWorld`, the shipped backend
*/

pub mod broad;
pub mod narrow_phase;
pub mod query;
pub mod types;
pub mod world;

pub use query::{CollisionQuery, QueryFilter};
pub use types::{
    CapsuleSpec, ColliderId, ColliderTag, Iso, KartId, Penetration, Quat, RayHit, SweepHit,
    Transform, Vec3,
};
pub use world::{ColliderDef, ColliderShapeDef, CollisionWorld};
