//! The logical device is the in-memory table of every virtual input the
//! runtime writes to. It is the single source of truth for "the current
//! value of output X" and is only ever mutated from the dispatch task.
use std::collections::BTreeMap;
use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::value::{HatDirection, InputValue};

/// Kinds of inputs stored on the logical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Axis,
    Button,
    Hat,
}

impl Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputType::Axis => write!(f, "axis"),
            InputType::Button => write!(f, "button"),
            InputType::Hat => write!(f, "hat"),
        }
    }
}

/// Possible errors when reading or writing the logical device
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogicalDeviceError {
    #[error("logical device has no {0} with id {1}")]
    UnknownInput(InputType, u32),
    #[error("value {1:?} cannot be stored in a {0}")]
    InvalidValue(InputType, InputValue),
}

/// Current state of a single logical input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Axis { value: f64 },
    Button { is_pressed: bool },
    Hat { direction: HatDirection },
}

impl Cell {
    fn default_for(input_type: InputType) -> Cell {
        match input_type {
            InputType::Axis => Cell::Axis { value: 0.0 },
            InputType::Button => Cell::Button { is_pressed: false },
            InputType::Hat => Cell::Hat {
                direction: HatDirection::Center,
            },
        }
    }

    /// Returns the cell contents as an [InputValue]
    pub fn as_value(&self) -> InputValue {
        match self {
            Cell::Axis { value } => InputValue::Float(*value),
            Cell::Button { is_pressed } => InputValue::Bool(*is_pressed),
            Cell::Hat { direction } => InputValue::Hat(*direction),
        }
    }
}

/// Number of inputs of each kind exposed by the logical device
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct LogicalDeviceLayout {
    #[serde(default = "default_axes")]
    pub axes: u32,
    #[serde(default = "default_buttons")]
    pub buttons: u32,
    #[serde(default = "default_hats")]
    pub hats: u32,
}

fn default_axes() -> u32 {
    8
}

fn default_buttons() -> u32 {
    128
}

fn default_hats() -> u32 {
    4
}

impl Default for LogicalDeviceLayout {
    fn default() -> Self {
        Self {
            axes: default_axes(),
            buttons: default_buttons(),
            hats: default_hats(),
        }
    }
}

/// In-memory state store addressed by `(InputType, input_id)`. Input ids
/// start at 1.
#[derive(Debug, Clone)]
pub struct LogicalDevice {
    cells: BTreeMap<(InputType, u32), Cell>,
}

impl LogicalDevice {
    /// Create a new logical device with all inputs declared by the layout
    pub fn new(layout: LogicalDeviceLayout) -> Self {
        let mut cells = BTreeMap::new();
        let counts = [
            (InputType::Axis, layout.axes),
            (InputType::Button, layout.buttons),
            (InputType::Hat, layout.hats),
        ];
        for (input_type, count) in counts {
            for id in 1..=count {
                cells.insert((input_type, id), Cell::default_for(input_type));
            }
        }
        Self { cells }
    }

    /// Returns true if the device declares the given input
    pub fn contains(&self, input_type: InputType, input_id: u32) -> bool {
        self.cells.contains_key(&(input_type, input_id))
    }

    /// Returns the current state of the given input
    pub fn get(&self, input_type: InputType, input_id: u32) -> Result<Cell, LogicalDeviceError> {
        self.cells
            .get(&(input_type, input_id))
            .copied()
            .ok_or(LogicalDeviceError::UnknownInput(input_type, input_id))
    }

    /// Set the value of the given input. Axis values are clamped to [-1, 1]
    /// and hat vectors are snapped to the nearest direction. Returns the
    /// stored cell.
    pub fn update(
        &mut self,
        input_type: InputType,
        input_id: u32,
        value: InputValue,
    ) -> Result<Cell, LogicalDeviceError> {
        let cell = self
            .cells
            .get_mut(&(input_type, input_id))
            .ok_or(LogicalDeviceError::UnknownInput(input_type, input_id))?;

        let new_cell = match (input_type, value) {
            (InputType::Axis, InputValue::Float(v)) => {
                if v.is_nan() {
                    return Err(LogicalDeviceError::InvalidValue(input_type, value));
                }
                Cell::Axis {
                    value: v.clamp(-1.0, 1.0),
                }
            }
            (InputType::Button, InputValue::Bool(pressed)) => Cell::Button {
                is_pressed: pressed,
            },
            (InputType::Hat, InputValue::Hat(direction)) => Cell::Hat { direction },
            (InputType::Hat, InputValue::Vector2 { x, y }) => Cell::Hat {
                direction: HatDirection::from_vector(x, y),
            },
            _ => return Err(LogicalDeviceError::InvalidValue(input_type, value)),
        };
        *cell = new_cell;

        Ok(new_cell)
    }

    /// Offset the given axis by `delta`, clamping the result to [-1, 1].
    /// Returns the new axis value.
    pub fn set_axis_relative(&mut self, input_id: u32, delta: f64) -> Result<f64, LogicalDeviceError> {
        let current = match self.get(InputType::Axis, input_id)? {
            Cell::Axis { value } => value,
            _ => 0.0,
        };
        match self.update(InputType::Axis, input_id, InputValue::Float(current + delta))? {
            Cell::Axis { value } => Ok(value),
            _ => Ok(current),
        }
    }

    /// Return every input to its released/centered default
    pub fn reset(&mut self) {
        log::debug!("Resetting logical device");
        for ((input_type, _), cell) in self.cells.iter_mut() {
            *cell = Cell::default_for(*input_type);
        }
    }

    /// Returns a snapshot of all inputs, ordered by type and id
    pub fn cells(&self) -> Vec<(InputType, u32, Cell)> {
        self.cells
            .iter()
            .map(|((input_type, id), cell)| (*input_type, *id, *cell))
            .collect()
    }
}

impl Default for LogicalDevice {
    fn default() -> Self {
        Self::new(LogicalDeviceLayout::default())
    }
}
