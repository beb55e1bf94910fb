pub const BUS_NAME: &str = "org.joyweave.Remapper";
pub const BUS_PATH: &str = "/org/joyweave/Remapper";

/// Device guid used for every input on the logical (virtual) joystick
pub const LOGICAL_DEVICE_GUID: &str = "logical";
/// Device guid used for synthesized keyboard events
pub const KEYBOARD_GUID: &str = "keyboard";
/// Device guid used for synthesized mouse events
pub const MOUSE_GUID: &str = "mouse";

/// Default time in seconds between consecutive macro actions
pub const DEFAULT_MACRO_DELAY: f64 = 0.05;
