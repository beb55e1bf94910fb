//! Declarative action graph as loaded from a profile. Every [Action] node is
//! turned into exactly one runtime functor when a profile is loaded.
pub mod condition;


use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use self::condition::ConditionExpr;
use super::{
    curve::{CurveConfig, Deadzone},
    event::{value::HatDirection, EventType, InputKey},
    logical_device::InputType,
    macros::Macro,
};

/// A single node of the action graph
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Action {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }
}

/// All supported action types, tagged by the `type` field
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Remap(RemapAction),
    Condition(ConditionAction),
    Chain(ChainAction),
    Tempo(TempoAction),
    DoubleTap(DoubleTapAction),
    DoubleTapTempo(DoubleTapTempoAction),
    Macro(Macro),
    MergeAxis(MergeAxisAction),
    SplitAxis(SplitAxisAction),
    ResponseCurve(ResponseCurveAction),
    SmartToggle(SmartToggleAction),
    PauseResume(PauseResumeAction),
    SwitchMode(ModeTarget),
    TemporaryMode(ModeTarget),
    CycleModes(CycleModesAction),
    PreviousMode,
}

impl ActionKind {
    /// Tag used to look up the functor constructor for this action
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::Remap(_) => "remap",
            ActionKind::Condition(_) => "condition",
            ActionKind::Chain(_) => "chain",
            ActionKind::Tempo(_) => "tempo",
            ActionKind::DoubleTap(_) => "double_tap",
            ActionKind::DoubleTapTempo(_) => "double_tap_tempo",
            ActionKind::Macro(_) => "macro",
            ActionKind::MergeAxis(_) => "merge_axis",
            ActionKind::SplitAxis(_) => "split_axis",
            ActionKind::ResponseCurve(_) => "response_curve",
            ActionKind::SmartToggle(_) => "smart_toggle",
            ActionKind::PauseResume(_) => "pause_resume",
            ActionKind::SwitchMode(_) => "switch_mode",
            ActionKind::TemporaryMode(_) => "temporary_mode",
            ActionKind::CycleModes(_) => "cycle_modes",
            ActionKind::PreviousMode => "previous_mode",
        }
    }

    /// Returns the direct children of container actions
    pub fn children(&self) -> Vec<&Action> {
        match self {
            ActionKind::Condition(action) => action
                .when_true
                .iter()
                .chain(action.when_false.iter())
                .collect(),
            ActionKind::Chain(action) => action.children.iter().collect(),
            ActionKind::Tempo(action) => vec![action.short.as_ref(), action.long.as_ref()],
            ActionKind::DoubleTap(action) => vec![action.single.as_ref(), action.double.as_ref()],
            ActionKind::DoubleTapTempo(action) => [
                &action.short_single,
                &action.long_single,
                &action.short_double,
                &action.long_double,
            ]
            .into_iter()
            .filter_map(|child| child.as_deref())
            .collect(),
            ActionKind::SmartToggle(action) => vec![action.action.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Names of the modes this action switches to, if any
    pub fn referenced_modes(&self) -> Vec<&str> {
        match self {
            ActionKind::SwitchMode(target) | ActionKind::TemporaryMode(target) => {
                vec![target.mode.as_str()]
            }
            ActionKind::CycleModes(action) => action.modes.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// How a physical input is presented to the actions bound to it
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Actions receive the input as is
    #[default]
    Native,
    /// An axis acts as a button that is pressed while inside `[low, high]`
    AxisButton { low: f64, high: f64 },
    /// A hat acts as a button that is pressed while in one of the directions
    HatButton { directions: Vec<HatDirection> },
}

impl Behavior {
    /// The kind of value actions bound with this behavior receive
    pub fn input_type(&self, key: &InputKey) -> InputType {
        match self {
            Behavior::AxisButton { .. } | Behavior::HatButton { .. } => InputType::Button,
            Behavior::Native => match key.event_type {
                EventType::Axis | EventType::MouseMotion => InputType::Axis,
                EventType::Hat => InputType::Hat,
                _ => InputType::Button,
            },
        }
    }
}

/// Output written by a [RemapAction]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemapTarget {
    /// Logical device button
    Button(u32),
    /// Logical device axis
    Axis(u32),
    /// Logical device hat
    Hat(u32),
    Key {
        scan_code: u32,
        #[serde(default)]
        extended: bool,
    },
    MouseButton(u32),
    MouseMotion {
        axis: MotionAxis,
        #[serde(default = "default_sensitivity")]
        sensitivity: f64,
    },
}

impl Display for RemapTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemapTarget::Button(id) => write!(f, "button {id}"),
            RemapTarget::Axis(id) => write!(f, "axis {id}"),
            RemapTarget::Hat(id) => write!(f, "hat {id}"),
            RemapTarget::Key {
                scan_code,
                extended,
            } => write!(f, "key {scan_code:#x} (extended: {extended})"),
            RemapTarget::MouseButton(id) => write!(f, "mouse button {id}"),
            RemapTarget::MouseMotion { axis, .. } => write!(f, "mouse motion {axis:?}"),
        }
    }
}

fn default_sensitivity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MotionAxis {
    X,
    Y,
}

impl MotionAxis {
    pub fn input_id(&self) -> u32 {
        match self {
            MotionAxis::X => 0,
            MotionAxis::Y => 1,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RemapAction {
    pub target: RemapTarget,
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConditionAction {
    pub condition: ConditionExpr,
    #[serde(default)]
    pub when_true: Vec<Action>,
    #[serde(default)]
    pub when_false: Vec<Action>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ChainAction {
    pub children: Vec<Action>,
    /// Seconds of inactivity after which the chain restarts at its first
    /// child
    pub timeout: Option<f64>,
    /// Stop later actions bound to the same input from running
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct TempoAction {
    pub short: Box<Action>,
    pub long: Box<Action>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Whether the single tap action also runs when a double tap is detected
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DoubleTapActivation {
    #[default]
    Exclusive,
    Combined,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DoubleTapAction {
    pub single: Box<Action>,
    pub double: Box<Action>,
    #[serde(default = "default_threshold")]
    pub window: f64,
    #[serde(default)]
    pub activate: DoubleTapActivation,
}

/// Combination of tap count and hold length. Outcomes without an action are
/// ignored.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DoubleTapTempoAction {
    pub short_single: Option<Box<Action>>,
    pub long_single: Option<Box<Action>>,
    pub short_double: Option<Box<Action>>,
    pub long_double: Option<Box<Action>>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_threshold")]
    pub window: f64,
}

/// How two axes are combined into one logical axis
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MergeOperation {
    Average,
    Sum,
    Maximum,
    Minimum,
    Bidirectional,
}

impl MergeOperation {
    /// Combine the values of the first (`a`) and second (`b`) axis
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        let value = match self {
            MergeOperation::Average => (a + b) / 2.0,
            MergeOperation::Sum => a + b,
            MergeOperation::Maximum => -a.max(b) / 2.0,
            MergeOperation::Minimum => -a.min(b) / 2.0,
            MergeOperation::Bidirectional => (b - a) / 4.0,
        };
        value.clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct MergeAxisAction {
    pub first: InputKey,
    pub second: InputKey,
    pub operation: MergeOperation,
    /// Logical axis receiving the merged value
    pub output: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SplitAxisAction {
    #[serde(default)]
    pub split: f64,
    /// Logical axis driven by the part below the split point
    pub lower: u32,
    /// Logical axis driven by the part above the split point
    pub upper: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ResponseCurveAction {
    #[serde(default)]
    pub deadzone: Deadzone,
    pub curve: Option<CurveConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SmartToggleAction {
    pub action: Box<Action>,
    /// Holds at least this long (seconds) behave like a normal button
    #[serde(default = "default_threshold")]
    pub hold_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PauseOperation {
    Pause,
    Resume,
    Toggle,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct PauseResumeAction {
    pub operation: PauseOperation,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ModeTarget {
    pub mode: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CycleModesAction {
    pub modes: Vec<String>,
}
