use crate::collision::KartId;

/// Something that happened to a kart during a step.
///
/// Events are returned from the step in the order they occurred; nothing is dispatched
/// through callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KartEvent {
    BecameGrounded,
    BecameAirborne,
    Hopped,
    DriftStarted,
    DriftEnded,
    /// The kart's velocity was replaced by another kart's collision response.
    KartCollision { other: KartId },
}
