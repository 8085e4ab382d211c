//! Animated charge particles.
//!
//! Particles are laid out evenly along every element and moved each frame
//! with a speed proportional to the element's current. See
//! [`ChargeAnimator`] for the per-frame rules.

mod animator;
mod layout;

pub use animator::{ChargeAnimator, MAX_DT, MAX_POSITION_CHANGE, MINIMUM_CURRENT, SPEED_SCALE};
pub(crate) use layout::layout_charges;
pub use layout::charge_distances;

use crate::circuit::ElementId;

/// Target spacing between neighbouring particles, in view units.
pub const CHARGE_SEPARATION: f64 = 28.0;

/// A particle bound to one element at a distance along its path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    pub element: ElementId,
    pub distance: f64,
    /// -1 for electrons, +1 for conventional current
    pub charge: f64,
}

impl Charge {
    pub fn new(element: ElementId, distance: f64, charge: f64) -> Self {
        Self {
            element,
            distance,
            charge,
        }
    }
}
