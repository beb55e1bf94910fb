pub mod value;


use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{KEYBOARD_GUID, LOGICAL_DEVICE_GUID, MOUSE_GUID};

use self::value::{HatDirection, InputValue};

/// The kind of input an [Event] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Axis,
    Button,
    Hat,
    Key,
    MouseButton,
    MouseMotion,
}

impl EventType {
    /// Returns true for inputs whose value is a pressed/released state
    pub fn is_button_like(&self) -> bool {
        matches!(
            self,
            EventType::Button | EventType::Key | EventType::MouseButton
        )
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventType::Axis => "axis",
            EventType::Button => "button",
            EventType::Hat => "hat",
            EventType::Key => "key",
            EventType::MouseButton => "mouse_button",
            EventType::MouseMotion => "mouse_motion",
        };
        write!(f, "{name}")
    }
}

/// Uniquely identifies a physical input: the device it belongs to, the kind
/// of input and its index on that device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct InputKey {
    pub device_guid: String,
    pub event_type: EventType,
    pub input_id: u32,
}

impl InputKey {
    pub fn new(device_guid: impl Into<String>, event_type: EventType, input_id: u32) -> Self {
        Self {
            device_guid: device_guid.into(),
            event_type,
            input_id,
        }
    }
}

impl Display for InputKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.device_guid, self.event_type, self.input_id)
    }
}

/// An [Event] describes a single input transition, either read from a
/// physical device or synthesized by the runtime.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub event_type: EventType,
    pub device_guid: String,
    pub input_id: u32,
    /// Name of the mode the event was processed or produced in. Events coming
    /// from the device layer may leave this empty.
    #[serde(default)]
    pub mode: String,
    pub value: InputValue,
    /// Unnormalized numeric value, as reported by the device
    #[serde(default)]
    pub raw_value: f64,
}

impl Event {
    /// Returns a new [Event] with the given identity and value
    pub fn new(event_type: EventType, device_guid: impl Into<String>, input_id: u32, value: InputValue) -> Self {
        Self {
            event_type,
            device_guid: device_guid.into(),
            input_id,
            mode: String::new(),
            raw_value: value.as_raw(),
            value,
        }
    }

    pub fn axis(device_guid: impl Into<String>, input_id: u32, value: f64) -> Self {
        Self::new(EventType::Axis, device_guid, input_id, InputValue::Float(value))
    }

    pub fn button(device_guid: impl Into<String>, input_id: u32, pressed: bool) -> Self {
        Self::new(EventType::Button, device_guid, input_id, InputValue::Bool(pressed))
    }

    pub fn hat(device_guid: impl Into<String>, input_id: u32, direction: HatDirection) -> Self {
        Self::new(EventType::Hat, device_guid, input_id, InputValue::Hat(direction))
    }

    /// Keyboard events encode the extended flag in bit 8 of the input id
    pub fn key(scan_code: u32, extended: bool, pressed: bool) -> Self {
        Self::new(
            EventType::Key,
            KEYBOARD_GUID,
            key_input_id(scan_code, extended),
            InputValue::Bool(pressed),
        )
    }

    pub fn mouse_button(button: u32, pressed: bool) -> Self {
        Self::new(EventType::MouseButton, MOUSE_GUID, button, InputValue::Bool(pressed))
    }

    /// Relative mouse motion. Input id 0 is the x axis and 1 is the y axis.
    pub fn mouse_motion(input_id: u32, delta: f64) -> Self {
        Self::new(EventType::MouseMotion, MOUSE_GUID, input_id, InputValue::Float(delta))
    }

    /// Output event for an input on the logical device
    pub fn logical(event_type: EventType, input_id: u32, value: InputValue) -> Self {
        Self::new(event_type, LOGICAL_DEVICE_GUID, input_id, value)
    }

    /// Returns a copy of this event stamped with the given mode
    pub fn with_mode(&self, mode: &str) -> Self {
        let mut event = self.clone();
        event.mode = mode.to_string();
        event
    }

    /// Returns a copy of this event carrying a different value
    pub fn with_value(&self, value: InputValue) -> Self {
        let mut event = self.clone();
        event.raw_value = value.as_raw();
        event.value = value;
        event
    }

    /// Returns the key identifying the input this event came from
    pub fn input_key(&self) -> InputKey {
        InputKey::new(self.device_guid.clone(), self.event_type, self.input_id)
    }

    /// Pressed state for button-like events and hats. Axis and motion events
    /// have no pressed state.
    pub fn is_pressed(&self) -> Option<bool> {
        match self.event_type {
            EventType::Button | EventType::Key | EventType::MouseButton => {
                Some(self.value.pressed())
            }
            EventType::Hat => Some(self.value.pressed()),
            EventType::Axis | EventType::MouseMotion => match self.value {
                InputValue::Bool(pressed) => Some(pressed),
                _ => None,
            },
        }
    }
}

/// Encode a keyboard scan code and its extended flag into an input id
pub fn key_input_id(scan_code: u32, extended: bool) -> u32 {
    if extended {
        scan_code | 0x100
    } else {
        scan_code
    }
}
