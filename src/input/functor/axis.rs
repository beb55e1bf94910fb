//! Axis shaping functors
use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind, MergeOperation},
        curve::{Curve, Deadzone},
        dispatcher::RuntimeError,
        event::{value::InputValue, Event, InputKey},
        logical_device::InputType,
    },
};

use super::{Context, Flow, Functor, FunctorBuilder, NodeId, Value};

/// Applies a deadzone and an optional response curve to the value passed on
/// to the following functors
#[derive(Debug)]
pub struct ResponseCurve {
    id: NodeId,
    deadzone: Deadzone,
    curve: Option<Curve>,
}

pub fn build_curve(
    action: &Action,
    builder: &mut FunctorBuilder,
) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::ResponseCurve(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "response_curve"));
    };
    require_axis(action, builder)?;
    config
        .deadzone
        .validate()
        .map_err(|e| ConfigError::MalformedCurve(action.id, e))?;
    let curve = config
        .curve
        .as_ref()
        .map(Curve::from_config)
        .transpose()
        .map_err(|e| ConfigError::MalformedCurve(action.id, e))?;
    Ok(Box::new(ResponseCurve {
        id: builder.next_id(),
        deadzone: config.deadzone,
        curve,
    }))
}

impl ResponseCurve {
    pub fn apply(&self, value: f64) -> f64 {
        let value = self.deadzone.apply(value);
        match self.curve.as_ref() {
            Some(curve) => curve.evaluate(value),
            None => value,
        }
    }
}

impl Functor for ResponseCurve {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        _event: &Event,
        value: &mut Value,
        _ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        if let Some(v) = value.current.as_float() {
            value.current = InputValue::Float(self.apply(v));
        }
        Ok(Flow::Continue)
    }
}

/// Combines two physical axes into one logical axis. The functor is bound
/// to both inputs and keeps the latest value of each.
#[derive(Debug)]
pub struct MergeAxis {
    id: NodeId,
    first: InputKey,
    second: InputKey,
    operation: MergeOperation,
    output: u32,
    values: (f64, f64),
}

pub fn build_merge(
    action: &Action,
    builder: &mut FunctorBuilder,
) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::MergeAxis(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "merge_axis"));
    };
    require_axis(action, builder)?;
    builder.require_logical(action, InputType::Axis, config.output)?;
    if config.first == config.second {
        return Err(ConfigError::InvalidParameter(
            action.id,
            "merged axes must be different inputs".to_string(),
        ));
    }
    Ok(Box::new(MergeAxis {
        id: builder.next_id(),
        first: config.first.clone(),
        second: config.second.clone(),
        operation: config.operation,
        output: config.output,
        values: (0.0, 0.0),
    }))
}

impl Functor for MergeAxis {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let Some(v) = value.current.as_float() else {
            return Ok(Flow::Continue);
        };
        let key = event.input_key();
        if key == self.first {
            self.values.0 = v;
        } else if key == self.second {
            self.values.1 = v;
        } else {
            log::trace!("Merge axis {} ignoring unrelated input {key}", self.id);
            return Ok(Flow::Continue);
        }

        let (a, b) = self.values;
        let merged = self.operation.apply(a, b);
        log::trace!("Merge axis {}: {a} {:?} {b} = {merged}", self.id, self.operation);
        ctx.outputs
            .set_logical(InputType::Axis, self.output, InputValue::Float(merged))?;
        Ok(Flow::Continue)
    }

    fn extra_inputs(&self) -> Vec<InputKey> {
        vec![self.first.clone(), self.second.clone()]
    }
}

/// Splits one physical axis into two logical axes around a split point
#[derive(Debug)]
pub struct SplitAxis {
    id: NodeId,
    split: f64,
    lower: u32,
    upper: u32,
}

pub fn build_split(
    action: &Action,
    builder: &mut FunctorBuilder,
) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::SplitAxis(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "split_axis"));
    };
    require_axis(action, builder)?;
    if !(config.split > -1.0 && config.split < 1.0) {
        return Err(ConfigError::InvalidParameter(
            action.id,
            format!("split point {} must lie inside (-1, 1)", config.split),
        ));
    }
    builder.require_logical(action, InputType::Axis, config.lower)?;
    builder.require_logical(action, InputType::Axis, config.upper)?;
    Ok(Box::new(SplitAxis {
        id: builder.next_id(),
        split: config.split,
        lower: config.lower,
        upper: config.upper,
    }))
}

impl SplitAxis {
    /// Values of the lower and upper output for the given input
    pub fn split(&self, value: f64) -> (f64, f64) {
        let s = self.split;
        if value <= s {
            (-1.0 + 2.0 * (s - value) / (s + 1.0), -1.0)
        } else {
            (-1.0, -1.0 + 2.0 * (value - s) / (1.0 - s))
        }
    }
}

impl Functor for SplitAxis {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        _event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let Some(v) = value.current.as_float() else {
            return Ok(Flow::Continue);
        };
        let (lower, upper) = self.split(v.clamp(-1.0, 1.0));
        ctx.outputs
            .set_logical(InputType::Axis, self.lower, InputValue::Float(lower))?;
        ctx.outputs
            .set_logical(InputType::Axis, self.upper, InputValue::Float(upper))?;
        Ok(Flow::Continue)
    }
}

fn require_axis(action: &Action, builder: &FunctorBuilder) -> Result<(), ConfigError> {
    if builder.input_type() != InputType::Axis {
        return Err(ConfigError::InvalidParameter(
            action.id,
            format!("{} must be bound to an axis", action.kind.tag()),
        ));
    }
    Ok(())
}
