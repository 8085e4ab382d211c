//! Resistive elements: Wire, Resistor, LightBulb, SeriesAmmeter.

use super::{
    DEFAULT_RESISTIVITY, METERS_PER_VIEW_COORDINATE, MINIMUM_RESISTANCE,
    WIRE_CROSS_SECTIONAL_AREA,
};

/// A stretchable wire.
///
/// Resistance follows the wire's length in view coordinates:
///   R = max(R_min, ρ * L / A)
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    /// Resistivity in ohm-meters
    pub resistivity: f64,
    /// Resistance for the current length
    pub resistance: f64,
}

impl Wire {
    /// Create a new wire with the given resistivity.
    pub fn new(resistivity: f64) -> Self {
        Self {
            resistivity,
            resistance: MINIMUM_RESISTANCE,
        }
    }

    /// Recompute the resistance for a wire of `length` view units.
    pub fn update_resistance(&mut self, length: f64) {
        let meters = length * METERS_PER_VIEW_COORDINATE;
        let resistance = self.resistivity * meters / WIRE_CROSS_SECTIONAL_AREA;
        self.resistance = resistance.max(MINIMUM_RESISTANCE);
    }
}

impl Default for Wire {
    fn default() -> Self {
        Self::new(DEFAULT_RESISTIVITY)
    }
}

/// Catalogue of resistive items, each with its own default resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResistorType {
    #[default]
    Resistor,
    HighResistanceResistor,
    Coin,
    PaperClip,
    Pencil,
    Eraser,
    Hand,
    Dog,
    DollarBill,
}

impl ResistorType {
    /// Resistance a freshly created item starts with.
    pub fn default_resistance(self) -> f64 {
        match self {
            Self::Resistor => 10.0,
            Self::HighResistanceResistor => 1000.0,
            Self::Coin => 0.003,
            Self::PaperClip => 0.01,
            Self::Pencil => 25.0,
            Self::Eraser => 1e9,
            Self::Hand => 1e6,
            Self::Dog => 1e4,
            Self::DollarBill => 1e9,
        }
    }

    /// Metallic items conduct like wires and can be probed by the ammeter.
    pub fn is_metallic(self) -> bool {
        matches!(self, Self::Coin | Self::PaperClip)
    }

    /// Only real resistors have an adjustable value.
    pub fn is_adjustable(self) -> bool {
        matches!(self, Self::Resistor | Self::HighResistanceResistor)
    }
}

/// A fixed-value resistor or household item.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub resistance: f64,
    pub resistor_type: ResistorType,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(resistance: f64) -> Self {
        Self {
            resistance,
            resistor_type: ResistorType::Resistor,
        }
    }

    /// Create a catalogue item with its default resistance.
    pub fn of_type(resistor_type: ResistorType) -> Self {
        Self {
            resistance: resistor_type.default_resistance(),
            resistor_type,
        }
    }
}

/// A light bulb.
///
/// A "real" bulb models filament self-heating: its resistance is
/// recomputed from the voltage across it on every solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LightBulb {
    pub resistance: f64,
    pub real: bool,
}

impl LightBulb {
    /// Resistance of a real bulb with no voltage across it.
    pub const REAL_BULB_COLD_RESISTANCE: f64 = 10.0;

    /// Create a fixed-resistance bulb.
    pub fn new(resistance: f64) -> Self {
        Self {
            resistance,
            real: false,
        }
    }

    /// Create a self-heating bulb starting cold.
    pub fn real() -> Self {
        Self {
            resistance: Self::REAL_BULB_COLD_RESISTANCE,
            real: true,
        }
    }

    /// Filament resistance for a voltage magnitude `v`:
    ///   R = R_cold + 3 * V / log2(V + 2)
    pub fn hot_resistance(v: f64) -> f64 {
        let v = v.abs();
        Self::REAL_BULB_COLD_RESISTANCE + 3.0 * v / (v + 2.0).log2()
    }

    /// Drop back to the cold resistance (real bulbs only).
    pub fn cool_down(&mut self) {
        if self.real {
            self.resistance = Self::REAL_BULB_COLD_RESISTANCE;
        }
    }
}

/// An ammeter inserted in series with the circuit; ideally zero resistance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesAmmeter;
