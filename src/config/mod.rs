pub mod path;

#[cfg(test)]
pub mod config_test;

use std::{collections::HashSet, io, path::Path};

use glob_match::glob_match;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::with::singleton_map_recursive;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    constants::DEFAULT_MACRO_DELAY,
    input::{
        action::{Action, Behavior},
        curve::CurveError,
        event::{EventType, InputKey},
        logical_device::{InputType, LogicalDeviceLayout},
    },
};

/// Represents all possible errors loading a [Profile]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Invalid profile: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Deserialize YAML in which enum variants carrying data are written as
/// single key maps, e.g. `axis_button: { low: 0.9, high: 1.0 }`
pub fn from_yaml_str<T: DeserializeOwned>(content: &str) -> Result<T, serde_yaml::Error> {
    singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(content))
}

/// Semantic problems in an otherwise well-formed profile
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("profile defines no modes")]
    NoModes,
    #[error("mode '{0}' is defined more than once")]
    DuplicateMode(String),
    #[error("unknown mode: {0}")]
    UnknownMode(String),
    #[error("mode inheritance cycle involving '{0}'")]
    ModeCycle(String),
    #[error("no functor registered for action type '{0}'")]
    UnknownActionTag(String),
    #[error("action {0} cannot be built as '{1}'")]
    UnexpectedAction(Uuid, &'static str),
    #[error("action {0} ({1}) must be bound to a button or a virtual button")]
    RequiresButton(Uuid, &'static str),
    #[error("action {id} cannot remap {input} input to {target}")]
    IncompatibleRemap {
        id: Uuid,
        input: InputType,
        target: String,
    },
    #[error("action {0}: logical device has no {1} with id {2}")]
    UnknownLogicalInput(Uuid, InputType, u32),
    #[error("action {0}: malformed curve: {1}")]
    MalformedCurve(Uuid, CurveError),
    #[error("action {0}: {1}")]
    InvalidParameter(Uuid, String),
    #[error("binding for {0}: {1}")]
    InvalidBehavior(InputKey, String),
}

/// Global profile settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ProfileSettings {
    /// Seconds between consecutive macro actions
    #[serde(default = "default_delay")]
    pub default_delay: f64,
    #[serde(default)]
    pub logical_device: LogicalDeviceLayout,
}

fn default_delay() -> f64 {
    DEFAULT_MACRO_DELAY
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            default_delay: default_delay(),
            logical_device: LogicalDeviceLayout::default(),
        }
    }
}

/// Actions bound to a single physical input
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct BindingConfig {
    pub input: InputKey,
    #[serde(default)]
    pub behavior: Behavior,
    pub actions: Vec<Action>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ModeConfig {
    pub name: String,
    pub parent: Option<String>,
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

/// Switch to `mode` whenever the focused process matches the `process` glob
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AutoSwitchRule {
    pub process: String,
    pub mode: String,
}

impl AutoSwitchRule {
    pub fn matches(&self, process: &str) -> bool {
        glob_match(self.process.as_str(), process)
    }
}

/// A remapping profile: modes, their bindings and global settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub version: u32,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    /// Mode active after loading. Defaults to the first declared mode.
    pub start_mode: Option<String>,
    #[serde(default)]
    pub settings: ProfileSettings,
    pub modes: Vec<ModeConfig>,
    #[serde(default)]
    pub auto_switch: Vec<AutoSwitchRule>,
}

impl Profile {
    /// Load a [Profile] from the given YAML string
    pub fn from_yaml(content: String) -> Result<Profile, LoadError> {
        let profile: Profile = from_yaml_str(content.as_str())?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a [Profile] from the given YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Profile, LoadError> {
        let file = std::fs::File::open(path)?;
        let deserializer = serde_yaml::Deserializer::from_reader(file);
        let profile: Profile = singleton_map_recursive::deserialize(deserializer)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Name of the mode that is active after loading
    pub fn start_mode(&self) -> Option<&str> {
        self.start_mode
            .as_deref()
            .or_else(|| self.modes.first().map(|mode| mode.name.as_str()))
    }

    /// Returns the mode with the given name
    pub fn mode(&self, name: &str) -> Option<&ModeConfig> {
        self.modes.iter().find(|mode| mode.name == name)
    }

    /// Returns the first auto switch rule matching the given process
    pub fn auto_switch_mode(&self, process: &str) -> Option<&str> {
        self.auto_switch
            .iter()
            .find(|rule| rule.matches(process))
            .map(|rule| rule.mode.as_str())
    }

    /// Check mode references, inheritance and binding parameters. Action
    /// parameters are checked when the actions are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modes.is_empty() {
            return Err(ConfigError::NoModes);
        }

        let mut names = HashSet::new();
        for mode in self.modes.iter() {
            if !names.insert(mode.name.as_str()) {
                return Err(ConfigError::DuplicateMode(mode.name.clone()));
            }
        }

        if let Some(start) = self.start_mode.as_ref() {
            if !names.contains(start.as_str()) {
                return Err(ConfigError::UnknownMode(start.clone()));
            }
        }

        for mode in self.modes.iter() {
            if let Some(parent) = mode.parent.as_ref() {
                if !names.contains(parent.as_str()) {
                    return Err(ConfigError::UnknownMode(parent.clone()));
                }
            }
            self.check_inheritance(mode)?;

            for binding in mode.bindings.iter() {
                Self::check_behavior(binding)?;
                for action in binding.actions.iter() {
                    Self::check_mode_references(action, &names)?;
                }
            }
        }

        for rule in self.auto_switch.iter() {
            if !names.contains(rule.mode.as_str()) {
                return Err(ConfigError::UnknownMode(rule.mode.clone()));
            }
        }

        Ok(())
    }

    fn check_inheritance(&self, mode: &ModeConfig) -> Result<(), ConfigError> {
        let mut visited = HashSet::new();
        let mut next = Some(mode);
        while let Some(current) = next {
            if !visited.insert(current.name.as_str()) {
                return Err(ConfigError::ModeCycle(mode.name.clone()));
            }
            next = current
                .parent
                .as_ref()
                .and_then(|parent| self.mode(parent.as_str()));
        }
        Ok(())
    }

    fn check_behavior(binding: &BindingConfig) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            ConfigError::InvalidBehavior(binding.input.clone(), reason.to_string())
        };
        match &binding.behavior {
            Behavior::Native => Ok(()),
            Behavior::AxisButton { low, high } => {
                if binding.input.event_type != EventType::Axis {
                    return Err(invalid("axis_button requires an axis input"));
                }
                if low > high || low.is_nan() || high.is_nan() {
                    return Err(invalid("axis_button range must satisfy low <= high"));
                }
                Ok(())
            }
            Behavior::HatButton { directions } => {
                if binding.input.event_type != EventType::Hat {
                    return Err(invalid("hat_button requires a hat input"));
                }
                if directions.is_empty() {
                    return Err(invalid("hat_button needs at least one direction"));
                }
                Ok(())
            }
        }
    }

    fn check_mode_references(action: &Action, names: &HashSet<&str>) -> Result<(), ConfigError> {
        for mode in action.kind.referenced_modes() {
            if !names.contains(mode) {
                return Err(ConfigError::UnknownMode(mode.to_string()));
            }
        }
        for child in action.kind.children() {
            Self::check_mode_references(child, names)?;
        }
        Ok(())
    }
}
