/// Per-step driver input read by a kart.
///
/// `hop_pressed` is edge-triggered: it stays true until the kart consumes it with
/// [`KartInput::consume_hop`], so a press lasts exactly one hop.
pub trait KartInput {
    /// Throttle in [-1, 1]. Negative values brake, then reverse.
    fn acceleration(&self) -> f32;
    /// Steering in [-1, 1]. Positive turns toward +X.
    fn steering(&self) -> f32;
    fn hop_pressed(&self) -> bool;
    fn hop_held(&self) -> bool;
    fn consume_hop(&mut self);
}

/// Plain input values, set by whoever drives the kart (player, AI, replay).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub acceleration: f32,
    pub steering: f32,
    pub hop_pressed: bool,
    pub hop_held: bool,
}

impl InputState {
    /// Full throttle, no steering, hop idle.
    pub fn throttle(acceleration: f32) -> Self {
        Self {
            acceleration: acceleration.clamp(-1.0, 1.0),
            ..Self::default()
        }
    }

    /// Register a hop press. The button counts as held until [`InputState::release_hop`].
    pub fn press_hop(&mut self) {
        self.hop_pressed = true;
        self.hop_held = true;
    }

    pub fn release_hop(&mut self) {
        self.hop_pressed = false;
        self.hop_held = false;
    }
}

impl KartInput for InputState {
    #[inline]
    fn acceleration(&self) -> f32 {
        self.acceleration
    }

    #[inline]
    fn steering(&self) -> f32 {
        self.steering
    }

    #[inline]
    fn hop_pressed(&self) -> bool {
        self.hop_pressed
    }

    #[inline]
    fn hop_held(&self) -> bool {
        self.hop_held
    }

    #[inline]
    fn consume_hop(&mut self) {
        self.hop_pressed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consuming_hop_keeps_it_held() {
        let mut input = InputState::throttle(2.0);
        assert_eq!(input.acceleration(), 1.0);

        input.press_hop();
        assert!(input.hop_pressed() && input.hop_held());
        input.consume_hop();
        assert!(!input.hop_pressed());
        assert!(input.hop_held());

        input.release_hop();
        assert!(!input.hop_held());
    }
}
