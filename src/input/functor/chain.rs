use std::time::{Duration, Instant};

use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind},
        dispatcher::RuntimeError,
        event::{Event, InputKey},
        timer::{seconds, TimerId},
    },
};

use super::{
    cancel_children, children_extra_inputs, forward_timer, Context, Flow, Functor,
    FunctorBuilder, NodeId, Value,
};

/// Runs its children in turn, advancing to the next child each time the
/// bound button is released
#[derive(Debug)]
pub struct Chain {
    id: NodeId,
    children: Vec<Box<dyn Functor>>,
    timeout: Option<Duration>,
    exclusive: bool,
    cursor: usize,
    /// Child that received the outstanding press
    active: Option<usize>,
    last_activity: Option<Instant>,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::Chain(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "chain"));
    };
    if config.children.is_empty() {
        return Err(ConfigError::InvalidParameter(
            action.id,
            "chain needs at least one child".to_string(),
        ));
    }
    if let Some(timeout) = config.timeout {
        if timeout.is_nan() || timeout < 0.0 {
            return Err(ConfigError::InvalidParameter(
                action.id,
                format!("invalid chain timeout {timeout}"),
            ));
        }
    }
    Ok(Box::new(Chain {
        id: builder.next_id(),
        children: builder.build_all(&config.children)?,
        timeout: config.timeout.filter(|t| *t > 0.0).map(seconds),
        exclusive: config.exclusive,
        cursor: 0,
        active: None,
        last_activity: None,
    }))
}

impl Chain {
    /// Index of the child the next press goes to
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn expire(&mut self, now: Instant) {
        let (Some(timeout), Some(last)) = (self.timeout, self.last_activity) else {
            return;
        };
        if self.cursor != 0 && now.saturating_duration_since(last) >= timeout {
            log::debug!("Chain {} timed out, restarting at the first child", self.id);
            self.cursor = 0;
        }
    }
}

impl Functor for Chain {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        match value.current.as_bool() {
            Some(true) => {
                if self.active.is_some() {
                    log::trace!("Chain {} ignoring repeated press", self.id);
                } else {
                    self.expire(ctx.now);
                    self.active = Some(self.cursor);
                    self.children[self.cursor].process_event(event, value, ctx)?;
                }
            }
            Some(false) => {
                if let Some(idx) = self.active.take() {
                    self.children[idx].process_event(event, value, ctx)?;
                    self.cursor = (idx + 1) % self.children.len();
                    log::trace!("Chain {} advanced to child {}", self.id, self.cursor);
                } else {
                    log::trace!("Chain {} ignoring release without press", self.id);
                }
            }
            None => {
                self.expire(ctx.now);
                self.children[self.cursor].process_event(event, value, ctx)?;
            }
        }
        self.last_activity = Some(ctx.now);

        if self.exclusive {
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    fn on_timer(
        &mut self,
        node: NodeId,
        timer: TimerId,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        forward_timer(&mut self.children, node, timer, ctx)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        cancel_children(&mut self.children, ctx);
    }

    fn extra_inputs(&self) -> Vec<InputKey> {
        children_extra_inputs(self.children.iter())
    }
}
