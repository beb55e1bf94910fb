use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Magnitude below which a hat vector is considered centered
const HAT_CENTER_THRESHOLD: f64 = 0.5;

/// One of the nine positions a hat switch can report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HatDirection {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl HatDirection {
    /// Directions ordered clockwise starting at north, matching 45 degree sectors
    const COMPASS: [HatDirection; 8] = [
        HatDirection::North,
        HatDirection::NorthEast,
        HatDirection::East,
        HatDirection::SouthEast,
        HatDirection::South,
        HatDirection::SouthWest,
        HatDirection::West,
        HatDirection::NorthWest,
    ];

    /// Snap the given vector to the nearest of the nine hat positions. Positive
    /// y points north, positive x points east.
    pub fn from_vector(x: f64, y: f64) -> HatDirection {
        if x.is_nan() || y.is_nan() || x.hypot(y) < HAT_CENTER_THRESHOLD {
            return HatDirection::Center;
        }

        // Angle measured clockwise from north
        let degrees = x.atan2(y).to_degrees().rem_euclid(360.0);
        let sector = ((degrees / 45.0).round() as usize) % 8;
        Self::COMPASS[sector]
    }

    /// Returns the unit vector components of this direction
    pub fn as_vector(&self) -> (f64, f64) {
        match self {
            HatDirection::Center => (0.0, 0.0),
            HatDirection::North => (0.0, 1.0),
            HatDirection::NorthEast => (1.0, 1.0),
            HatDirection::East => (1.0, 0.0),
            HatDirection::SouthEast => (1.0, -1.0),
            HatDirection::South => (0.0, -1.0),
            HatDirection::SouthWest => (-1.0, -1.0),
            HatDirection::West => (-1.0, 0.0),
            HatDirection::NorthWest => (-1.0, 1.0),
        }
    }

    /// Returns true if the hat is resting in the center position
    pub fn is_center(&self) -> bool {
        matches!(self, HatDirection::Center)
    }
}

impl Display for HatDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HatDirection::Center => "center",
            HatDirection::North => "north",
            HatDirection::NorthEast => "north_east",
            HatDirection::East => "east",
            HatDirection::SouthEast => "south_east",
            HatDirection::South => "south",
            HatDirection::SouthWest => "south_west",
            HatDirection::West => "west",
            HatDirection::NorthWest => "north_west",
        };
        write!(f, "{name}")
    }
}

/// InputValue represents the payload carried by an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InputValue {
    #[default]
    None,
    /// Bool values are used by buttons, keys and mouse buttons.
    Bool(bool),
    /// Float values are used by axes and relative mouse motion.
    Float(f64),
    /// Hat values are used by hat switches.
    Hat(HatDirection),
    /// Vector2 values are raw two-dimensional readings that still need to
    /// be normalized, e.g. a hat reported as x/y components.
    Vector2 { x: f64, y: f64 },
}

impl InputValue {
    /// Returns whether or not the value is "pressed"
    pub fn pressed(&self) -> bool {
        match self {
            InputValue::None => false,
            InputValue::Bool(value) => *value,
            InputValue::Float(value) => *value != 0.0,
            InputValue::Hat(direction) => !direction.is_center(),
            InputValue::Vector2 { x, y } => !HatDirection::from_vector(*x, *y).is_center(),
        }
    }

    /// Returns the boolean payload, if this is a bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            InputValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            InputValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the hat payload. Vector values are snapped to the nearest
    /// direction.
    pub fn as_hat(&self) -> Option<HatDirection> {
        match self {
            InputValue::Hat(direction) => Some(*direction),
            InputValue::Vector2 { x, y } => Some(HatDirection::from_vector(*x, *y)),
            _ => None,
        }
    }

    /// Numeric representation used for the `raw_value` of an event
    pub fn as_raw(&self) -> f64 {
        match self {
            InputValue::None => 0.0,
            InputValue::Bool(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            InputValue::Float(value) => *value,
            InputValue::Hat(direction) => Self::hat_index(*direction) as f64,
            InputValue::Vector2 { x, y } => Self::hat_index(HatDirection::from_vector(*x, *y)) as f64,
        }
    }

    fn hat_index(direction: HatDirection) -> i32 {
        match direction {
            HatDirection::Center => -1,
            other => HatDirection::COMPASS
                .iter()
                .position(|d| *d == other)
                .map(|idx| idx as i32)
                .unwrap_or(-1),
        }
    }
}
