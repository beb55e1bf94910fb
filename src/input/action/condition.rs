use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::input::{
    event::{value::HatDirection, InputKey},
    logical_device::InputType,
};

/// Boolean expression guarding a [super::ConditionAction]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionExpr {
    /// A single comparison
    Check(Predicate),
    /// True if every sub-expression holds. An empty list is true.
    All(Vec<ConditionExpr>),
    /// True if at least one sub-expression holds. An empty list is false.
    Any(Vec<ConditionExpr>),
    Not(Box<ConditionExpr>),
}

/// Compares the state of one input against an expected value
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Predicate {
    pub source: ConditionSource,
    pub comparison: Comparison,
}

/// Where the compared state comes from
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSource {
    /// The value of the event being processed, after any axis shaping
    Event,
    /// An input on the logical device
    Logical { input_type: InputType, input_id: u32 },
    /// The last value reported by a physical input
    Physical(InputKey),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Button (or hat) pressed state
    Pressed(bool),
    /// Inclusive axis range
    Range { low: f64, high: f64 },
    /// Hat is in one of the given directions
    Hat(Vec<HatDirection>),
}
