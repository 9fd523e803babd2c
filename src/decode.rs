//! Pure decode helpers: axis calibration and hat (POV / d-pad) reduction.
//!
//! ## Axis conventions
//! - **Bipolar** axes (sticks, twist) map the calibrated `[min, max]` onto `[-100, 100]`.
//! - **Unipolar** axes (sliders, triggers) map onto `[0, 100]`.
//! - Out-of-range raw values are clamped.
//!
//! ## Hat conventions
//! Two source encodings reduce to the same nine [`Pov`] values:
//! - a continuous angle in hundredths of a degree, clockwise from north (DirectInput style);
//! - two tri-state axes (evdev `ABS_HAT0X` / `ABS_HAT0Y` style), merged into a [`Compass`] mask.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Hat direction as a 4-bit mask. The horizontal pair is `WEST | EAST`, the vertical pair
    /// is `NORTH | SOUTH`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Compass: u8 {
        const WEST = 1 << 0;
        const EAST = 1 << 1;
        const NORTH = 1 << 2;
        const SOUTH = 1 << 3;

        const HORIZONTAL = Self::WEST.bits() | Self::EAST.bits();
        const VERTICAL = Self::NORTH.bits() | Self::SOUTH.bits();
    }
}

/// Decoded hat position.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Pov {
    #[default]
    None,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

/// Compass points in 45° steps starting at north, clockwise.
const ANGLE_TABLE: [Pov; 8] = [
    Pov::North,
    Pov::NorthEast,
    Pov::East,
    Pov::SouthEast,
    Pov::South,
    Pov::SouthWest,
    Pov::West,
    Pov::NorthWest,
];

/// Hundredths of a degree per compass step.
pub const ANGLE_STEP: u32 = 4500;

impl Pov {
    /// Decode a continuous angle (hundredths of a degree). Anything past the table is `None`.
    pub fn from_angle(angle: Option<u32>) -> Pov {
        angle
            .and_then(|a| ANGLE_TABLE.get((a / ANGLE_STEP) as usize).copied())
            .unwrap_or(Pov::None)
    }

    /// Decode a compass mask. Contradictory masks (north and south together) decode to `None`.
    pub fn from_compass(mask: Compass) -> Pov {
        ANGLE_TABLE
            .iter()
            .copied()
            .find(|pov| pov.compass() == mask)
            .unwrap_or(Pov::None)
    }

    /// Mask form of this position.
    pub fn compass(self) -> Compass {
        match self {
            Pov::None => Compass::empty(),
            Pov::North => Compass::NORTH,
            Pov::NorthEast => Compass::NORTH | Compass::EAST,
            Pov::East => Compass::EAST,
            Pov::SouthEast => Compass::SOUTH | Compass::EAST,
            Pov::South => Compass::SOUTH,
            Pov::SouthWest => Compass::SOUTH | Compass::WEST,
            Pov::West => Compass::WEST,
            Pov::NorthWest => Compass::NORTH | Compass::WEST,
        }
    }
}

impl From<Compass> for Pov {
    fn from(mask: Compass) -> Self {
        Pov::from_compass(mask)
    }
}

impl Compass {
    /// Replace the horizontal pair from a tri-state axis value, keeping the vertical pair.
    pub fn with_horizontal(self, value: i32) -> Compass {
        let bits = match value.signum() {
            -1 => Compass::WEST,
            1 => Compass::EAST,
            _ => Compass::empty(),
        };
        (self & Compass::VERTICAL) | bits
    }

    /// Replace the vertical pair from a tri-state axis value, keeping the horizontal pair.
    pub fn with_vertical(self, value: i32) -> Compass {
        let bits = match value.signum() {
            -1 => Compass::NORTH,
            1 => Compass::SOUTH,
            _ => Compass::empty(),
        };
        (self & Compass::HORIZONTAL) | bits
    }
}

/// Map `value` from the calibrated `[min, max]` onto `[-100, 100]`.
///
/// `round(200 * (value - min) / (max - min) - 100)`. A degenerate range yields `0`.
pub fn normalize_axis(value: i32, min: i32, max: i32) -> i32 {
    if max == min {
        return 0;
    }
    let scaled = 200.0 * (f64::from(value) - f64::from(min)) / (f64::from(max) - f64::from(min));
    (scaled - 100.0).round().clamp(-100.0, 100.0) as i32
}

/// Map `value` from the calibrated `[min, max]` onto `[0, 100]`.
pub fn normalize_unipolar(value: i32, min: i32, max: i32) -> i32 {
    if max == min {
        return 0;
    }
    let scaled = 100.0 * (f64::from(value) - f64::from(min)) / (f64::from(max) - f64::from(min));
    scaled.round().clamp(0.0, 100.0) as i32
}
