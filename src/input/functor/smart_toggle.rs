use std::time::{Duration, Instant};

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Off,
    /// Pressed at the given time, the child is active
    Held(Instant),
    /// Tapped, the child stays active until the next tap
    Latched,
    /// Pressed again while latched, the child is released on release
    Unlatching,
}

/// Short taps toggle the child on and off, long holds act like a normal
/// button
#[derive(Debug)]
pub struct SmartToggle {
    id: NodeId,
    child: Box<dyn Functor>,
    hold_threshold: Duration,
    state: ToggleState,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::SmartToggle(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "smart_toggle"));
    };
    builder.require_button(action)?;
    Ok(Box::new(SmartToggle {
        id: builder.next_id(),
        child: builder.build(&config.action)?,
        hold_threshold: seconds(config.hold_threshold),
        state: ToggleState::Off,
    }))
}

impl SmartToggle {
    pub fn state(&self) -> ToggleState {
        self.state
    }
}

impl Functor for SmartToggle {
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
            return Ok(Flow::Continue);
        };

        self.state = match (self.state, pressed) {
            (ToggleState::Off, true) => {
                send_button(self.child.as_mut(), event, true, ctx)?;
                ToggleState::Held(ctx.now)
            }
            (ToggleState::Held(since), false) => {
                if ctx.now.saturating_duration_since(since) >= self.hold_threshold {
                    send_button(self.child.as_mut(), event, false, ctx)?;
                    ToggleState::Off
                } else {
                    log::debug!("Smart toggle {} latched on", self.id);
                    ToggleState::Latched
                }
            }
            (ToggleState::Latched, true) => ToggleState::Unlatching,
            (ToggleState::Unlatching, false) => {
                log::debug!("Smart toggle {} latched off", self.id);
                send_button(self.child.as_mut(), event, false, ctx)?;
                ToggleState::Off
            }
            (state, _) => state,
        };
        Ok(Flow::Continue)
    }

    fn on_timer(
        &mut self,
        node: NodeId,
        timer: TimerId,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        self.child.on_timer(node, timer, ctx)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        self.child.cancel_timers(ctx);
    }
}
