use std::time::Duration;

use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind},
        dispatcher::RuntimeError,
        event::Event,
        timer::{seconds, TimerId},
    },
};

use super::{send_button, Context, Flow, Functor, FunctorBuilder, NodeId, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum TempoState {
    Idle,
    /// Pressed, waiting for either the release or the hold threshold
    Waiting { timer: TimerId, press: Event },
    /// Held past the threshold, the long action is pressed
    LongActive,
}

/// Runs `short` for taps and `long` for holds
#[derive(Debug)]
pub struct Tempo {
    id: NodeId,
    short: Box<dyn Functor>,
    long: Box<dyn Functor>,
    threshold: Duration,
    state: TempoState,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::Tempo(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "tempo"));
    };
    builder.require_button(action)?;
    Ok(Box::new(Tempo {
        id: builder.next_id(),
        short: builder.build(&config.short)?,
        long: builder.build(&config.long)?,
        threshold: seconds(config.threshold),
        state: TempoState::Idle,
    }))
}

impl Tempo {
    pub fn state(&self) -> &TempoState {
        &self.state
    }
}

impl Functor for Tempo {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let Some(pressed) = value.current.as_bool() else {
            log::trace!("Tempo {} ignoring non-button value", self.id);
            return Ok(Flow::Continue);
        };

        let state = std::mem::replace(&mut self.state, TempoState::Idle);
        self.state = match (state, pressed) {
            (TempoState::Idle, true) => {
                let timer = ctx.schedule(self.id, self.threshold);
                TempoState::Waiting {
                    timer,
                    press: event.clone(),
                }
            }
            (TempoState::Waiting { timer, press }, false) => {
                ctx.cancel(timer);
                log::debug!("Tempo {} detected a short press", self.id);
                send_button(self.short.as_mut(), &press, true, ctx)?;
                send_button(self.short.as_mut(), event, false, ctx)?;
                TempoState::Idle
            }
            (TempoState::LongActive, false) => {
                send_button(self.long.as_mut(), event, false, ctx)?;
                TempoState::Idle
            }
            (state, _) => {
                log::trace!("Tempo {} ignoring duplicate input in {state:?}", self.id);
                state
            }
        };
        Ok(Flow::Continue)
    }

    fn on_timer(
        &mut self,
        node: NodeId,
        timer: TimerId,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        if node != self.id {
            if self.short.on_timer(node, timer, ctx)? {
                return Ok(true);
            }
            return self.long.on_timer(node, timer, ctx);
        }

        match std::mem::replace(&mut self.state, TempoState::Idle) {
            TempoState::Waiting { timer: pending, press } if pending == timer => {
                log::debug!("Tempo {} detected a long press", self.id);
                self.state = TempoState::LongActive;
                send_button(self.long.as_mut(), &press, true, ctx)?;
            }
            state => {
                log::trace!("Tempo {} ignoring stale timer {timer}", self.id);
                self.state = state;
            }
        }
        Ok(true)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        if let TempoState::Waiting { timer, .. } = self.state {
            ctx.cancel(timer);
            self.state = TempoState::Idle;
        }
        self.short.cancel_timers(ctx);
        self.long.cancel_timers(ctx);
    }
}
