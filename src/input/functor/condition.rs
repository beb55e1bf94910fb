use std::collections::HashMap;

use crate::{
    config::ConfigError,
    input::{
        action::{
            condition::{Comparison, ConditionExpr, ConditionSource, Predicate},
            Action, ActionKind,
        },
        dispatcher::RuntimeError,
        event::{value::InputValue, Event, InputKey},
        logical_device::LogicalDevice,
        timer::TimerId,
    },
};

use super::{
    cancel_children, children_extra_inputs, forward_timer, Context, Flow, Functor,
    FunctorBuilder, NodeId, Value,
};

/// State an expression is evaluated against
pub struct Snapshot<'a> {
    pub value: InputValue,
    pub logical: &'a LogicalDevice,
    pub physical: &'a HashMap<InputKey, InputValue>,
}

impl ConditionExpr {
    /// Evaluate the expression against the given state
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        match self {
            ConditionExpr::Check(predicate) => predicate.evaluate(snapshot),
            ConditionExpr::All(exprs) => exprs.iter().all(|expr| expr.evaluate(snapshot)),
            ConditionExpr::Any(exprs) => exprs.iter().any(|expr| expr.evaluate(snapshot)),
            ConditionExpr::Not(expr) => !expr.evaluate(snapshot),
        }
    }
}

impl Predicate {
    fn evaluate(&self, snapshot: &Snapshot) -> bool {
        let value = match &self.source {
            ConditionSource::Event => snapshot.value,
            ConditionSource::Logical {
                input_type,
                input_id,
            } => match snapshot.logical.get(*input_type, *input_id) {
                Ok(cell) => cell.as_value(),
                Err(e) => {
                    log::warn!("Condition references missing input: {e}");
                    return false;
                }
            },
            // Inputs that never reported are considered at rest
            ConditionSource::Physical(key) => {
                snapshot.physical.get(key).copied().unwrap_or_default()
            }
        };

        match &self.comparison {
            Comparison::Pressed(expected) => value.pressed() == *expected,
            Comparison::Range { low, high } => match value {
                InputValue::Float(v) => (*low..=*high).contains(&v),
                InputValue::None => (*low..=*high).contains(&0.0),
                _ => false,
            },
            Comparison::Hat(directions) => value
                .as_hat()
                .map(|direction| directions.contains(&direction))
                .unwrap_or(false),
        }
    }
}

/// Runs one of two action lists depending on a condition
#[derive(Debug)]
pub struct Condition {
    id: NodeId,
    condition: ConditionExpr,
    when_true: Vec<Box<dyn Functor>>,
    when_false: Vec<Box<dyn Functor>>,
    /// Branch that received the last press, so its release goes there too
    latched: Option<bool>,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::Condition(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "condition"));
    };
    Ok(Box::new(Condition {
        id: builder.next_id(),
        condition: config.condition.clone(),
        when_true: builder.build_all(&config.when_true)?,
        when_false: builder.build_all(&config.when_false)?,
        latched: None,
    }))
}

impl Functor for Condition {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let pressed = value.current.as_bool();
        let branch = match (pressed, self.latched) {
            (Some(false), Some(branch)) => {
                self.latched = None;
                branch
            }
            _ => {
                let snapshot = Snapshot {
                    value: value.current,
                    logical: ctx.outputs.device(),
                    physical: ctx.physical,
                };
                self.condition.evaluate(&snapshot)
            }
        };
        if pressed == Some(true) {
            self.latched = Some(branch);
        }
        log::trace!("Condition {} took the {branch} branch", self.id);

        let children = if branch {
            &mut self.when_true
        } else {
            &mut self.when_false
        };
        for child in children.iter_mut() {
            if child.process_event(event, value, ctx)? == Flow::Stop {
                break;
            }
        }
        Ok(Flow::Continue)
    }

    fn on_timer(
        &mut self,
        node: NodeId,
        timer: TimerId,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        if forward_timer(&mut self.when_true, node, timer, ctx)? {
            return Ok(true);
        }
        forward_timer(&mut self.when_false, node, timer, ctx)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        cancel_children(&mut self.when_true, ctx);
        cancel_children(&mut self.when_false, ctx);
    }

    fn extra_inputs(&self) -> Vec<InputKey> {
        children_extra_inputs(self.when_true.iter().chain(self.when_false.iter()))
    }
}
