//! Control elements: Switch and Fuse.

/// A switch.
///
/// A closed switch conducts like a wire; an open switch is removed from the
/// nodal system and blocks every traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub closed: bool,
}

impl Switch {
    /// Create a new switch.
    pub fn new(closed: bool) -> Self {
        Self { closed }
    }

    /// Set the switch state.
    pub fn set_state(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// Toggle the switch state.
    pub fn toggle(&mut self) {
        self.closed = !self.closed;
    }
}

/// A fuse.
///
/// Conducts through a small resistance until the current magnitude exceeds
/// its rating, then stays open until reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Fuse {
    /// Trip threshold in amps
    pub current_rating: f64,
    pub resistance: f64,
    pub tripped: bool,
}

impl Fuse {
    pub const DEFAULT_CURRENT_RATING: f64 = 4.0;
    pub const DEFAULT_RESISTANCE: f64 = 0.005;

    /// Create a new intact fuse.
    pub fn new(current_rating: f64) -> Self {
        Self {
            current_rating,
            resistance: Self::DEFAULT_RESISTANCE,
            tripped: false,
        }
    }

    /// Trip if `current` exceeds the rating. Returns true on the transition.
    pub fn check(&mut self, current: f64) -> bool {
        if !self.tripped && current.abs() > self.current_rating {
            self.tripped = true;
            return true;
        }
        false
    }

    /// Restore a tripped fuse.
    pub fn reset(&mut self) {
        self.tripped = false;
    }
}

impl Default for Fuse {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CURRENT_RATING)
    }
}
