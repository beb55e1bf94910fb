use std::time::Duration;

use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind, DoubleTapActivation},
        dispatcher::RuntimeError,
        event::Event,
        timer::{seconds, TimerId},
    },
};

use super::{send_button, Context, Flow, Functor, FunctorBuilder, NodeId, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum DoubleTapState {
    Idle,
    FirstPressed { press: Event },
    /// First tap completed, waiting for a second press within the window
    WaitingSecond {
        timer: TimerId,
        press: Event,
        release: Event,
    },
    /// Second press detected, waiting for its release
    Resolved,
}

/// Distinguishes single taps from double taps
#[derive(Debug)]
pub struct DoubleTap {
    id: NodeId,
    single: Box<dyn Functor>,
    double: Box<dyn Functor>,
    window: Duration,
    activate: DoubleTapActivation,
    state: DoubleTapState,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::DoubleTap(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "double_tap"));
    };
    builder.require_button(action)?;
    Ok(Box::new(DoubleTap {
        id: builder.next_id(),
        single: builder.build(&config.single)?,
        double: builder.build(&config.double)?,
        window: seconds(config.window),
        activate: config.activate,
        state: DoubleTapState::Idle,
    }))
}

impl DoubleTap {
    pub fn state(&self) -> &DoubleTapState {
        &self.state
    }

    /// Forward the second tap to the double action, and to the single action
    /// first when running in combined mode
    fn second_tap(&mut self, event: &Event, pressed: bool, ctx: &mut Context) -> Result<(), RuntimeError> {
        if self.activate == DoubleTapActivation::Combined {
            send_button(self.single.as_mut(), event, pressed, ctx)?;
        }
        send_button(self.double.as_mut(), event, pressed, ctx)?;
        Ok(())
    }
}

impl Functor for DoubleTap {
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
            log::trace!("Double tap {} ignoring non-button value", self.id);
            return Ok(Flow::Continue);
        };

        let combined = self.activate == DoubleTapActivation::Combined;
        let state = std::mem::replace(&mut self.state, DoubleTapState::Idle);
        self.state = match (state, pressed) {
            (DoubleTapState::Idle, true) => {
                if combined {
                    send_button(self.single.as_mut(), event, true, ctx)?;
                }
                DoubleTapState::FirstPressed {
                    press: event.clone(),
                }
            }
            (DoubleTapState::FirstPressed { press }, false) => {
                if combined {
                    send_button(self.single.as_mut(), event, false, ctx)?;
                }
                DoubleTapState::WaitingSecond {
                    timer: ctx.schedule(self.id, self.window),
                    press,
                    release: event.clone(),
                }
            }
            (DoubleTapState::WaitingSecond { timer, .. }, true) => {
                ctx.cancel(timer);
                log::debug!("Double tap {} detected a double tap", self.id);
                self.second_tap(event, true, ctx)?;
                DoubleTapState::Resolved
            }
            (DoubleTapState::Resolved, false) => {
                self.second_tap(event, false, ctx)?;
                DoubleTapState::Idle
            }
            (state, _) => {
                log::trace!("Double tap {} ignoring duplicate input in {state:?}", self.id);
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
            if self.single.on_timer(node, timer, ctx)? {
                return Ok(true);
            }
            return self.double.on_timer(node, timer, ctx);
        }

        match std::mem::replace(&mut self.state, DoubleTapState::Idle) {
            DoubleTapState::WaitingSecond {
                timer: pending,
                press,
                release,
            } if pending == timer => {
                // Combined mode already delivered the first tap
                if self.activate == DoubleTapActivation::Exclusive {
                    log::debug!("Double tap {} window elapsed, single tap", self.id);
                    send_button(self.single.as_mut(), &press, true, ctx)?;
                    send_button(self.single.as_mut(), &release, false, ctx)?;
                }
            }
            state => {
                log::trace!("Double tap {} ignoring stale timer {timer}", self.id);
                self.state = state;
            }
        }
        Ok(true)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        match &self.state {
            DoubleTapState::WaitingSecond { timer, .. } => {
                ctx.cancel(*timer);
                self.state = DoubleTapState::Idle;
            }
            // In combined mode the single action holds the press until the
            // physical release
            DoubleTapState::FirstPressed { .. }
                if self.activate == DoubleTapActivation::Exclusive =>
            {
                self.state = DoubleTapState::Idle
            }
            _ => (),
        }
        self.single.cancel_timers(ctx);
        self.double.cancel_timers(ctx);
    }
}

/// Which of the four outcomes of a [DoubleTapTempo] is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    ShortSingle,
    LongSingle,
    ShortDouble,
    LongDouble,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DoubleTapTempoState {
    Idle,
    /// Pressed, the hold threshold timer is running
    Pressed {
        second: bool,
        timer: TimerId,
        press: Event,
    },
    /// First tap released, the double tap window is running
    WaitingSecond {
        timer: TimerId,
        press: Event,
        release: Event,
    },
    /// A long outcome is pressed until the physical release
    LongActive(TapOutcome),
}

/// Combination of double tap and tempo detection
#[derive(Debug)]
pub struct DoubleTapTempo {
    id: NodeId,
    short_single: Option<Box<dyn Functor>>,
    long_single: Option<Box<dyn Functor>>,
    short_double: Option<Box<dyn Functor>>,
    long_double: Option<Box<dyn Functor>>,
    threshold: Duration,
    window: Duration,
    state: DoubleTapTempoState,
}

pub fn build_tempo(
    action: &Action,
    builder: &mut FunctorBuilder,
) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::DoubleTapTempo(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "double_tap_tempo"));
    };
    builder.require_button(action)?;
    let id = builder.next_id();
    let mut child = |action: &Option<Box<Action>>| -> Result<Option<Box<dyn Functor>>, ConfigError> {
        action.as_ref().map(|action| builder.build(action)).transpose()
    };
    Ok(Box::new(DoubleTapTempo {
        id,
        short_single: child(&config.short_single)?,
        long_single: child(&config.long_single)?,
        short_double: child(&config.short_double)?,
        long_double: child(&config.long_double)?,
        threshold: seconds(config.threshold),
        window: seconds(config.window),
        state: DoubleTapTempoState::Idle,
    }))
}

impl DoubleTapTempo {
    pub fn state(&self) -> &DoubleTapTempoState {
        &self.state
    }

    fn outcome(&mut self, outcome: TapOutcome) -> Option<&mut Box<dyn Functor>> {
        match outcome {
            TapOutcome::ShortSingle => self.short_single.as_mut(),
            TapOutcome::LongSingle => self.long_single.as_mut(),
            TapOutcome::ShortDouble => self.short_double.as_mut(),
            TapOutcome::LongDouble => self.long_double.as_mut(),
        }
    }

    fn send(
        &mut self,
        outcome: TapOutcome,
        event: &Event,
        pressed: bool,
        ctx: &mut Context,
    ) -> Result<(), RuntimeError> {
        log::trace!("Double tap tempo {} sending {pressed} to {outcome:?}", self.id);
        if let Some(child) = self.outcome(outcome) {
            send_button(child.as_mut(), event, pressed, ctx)?;
        }
        Ok(())
    }

    fn children(&mut self) -> impl Iterator<Item = &mut Box<dyn Functor>> {
        [
            self.short_single.as_mut(),
            self.long_single.as_mut(),
            self.short_double.as_mut(),
            self.long_double.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

impl Functor for DoubleTapTempo {
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

        let state = std::mem::replace(&mut self.state, DoubleTapTempoState::Idle);
        self.state = match (state, pressed) {
            (DoubleTapTempoState::Idle, true) => DoubleTapTempoState::Pressed {
                second: false,
                timer: ctx.schedule(self.id, self.threshold),
                press: event.clone(),
            },
            (
                DoubleTapTempoState::Pressed {
                    second: false,
                    timer,
                    press,
                },
                false,
            ) => {
                ctx.cancel(timer);
                DoubleTapTempoState::WaitingSecond {
                    timer: ctx.schedule(self.id, self.window),
                    press,
                    release: event.clone(),
                }
            }
            (
                DoubleTapTempoState::Pressed {
                    second: true,
                    timer,
                    press,
                },
                false,
            ) => {
                ctx.cancel(timer);
                self.send(TapOutcome::ShortDouble, &press, true, ctx)?;
                self.send(TapOutcome::ShortDouble, event, false, ctx)?;
                DoubleTapTempoState::Idle
            }
            (DoubleTapTempoState::WaitingSecond { timer, .. }, true) => {
                ctx.cancel(timer);
                DoubleTapTempoState::Pressed {
                    second: true,
                    timer: ctx.schedule(self.id, self.threshold),
                    press: event.clone(),
                }
            }
            (DoubleTapTempoState::LongActive(outcome), false) => {
                self.send(outcome, event, false, ctx)?;
                DoubleTapTempoState::Idle
            }
            (state, _) => {
                log::trace!("Double tap tempo {} ignoring duplicate input", self.id);
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
            for child in self.children() {
                if child.on_timer(node, timer, ctx)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        match std::mem::replace(&mut self.state, DoubleTapTempoState::Idle) {
            DoubleTapTempoState::Pressed {
                second,
                timer: pending,
                press,
            } if pending == timer => {
                let outcome = if second {
                    TapOutcome::LongDouble
                } else {
                    TapOutcome::LongSingle
                };
                self.state = DoubleTapTempoState::LongActive(outcome);
                self.send(outcome, &press, true, ctx)?;
            }
            DoubleTapTempoState::WaitingSecond {
                timer: pending,
                press,
                release,
            } if pending == timer => {
                self.send(TapOutcome::ShortSingle, &press, true, ctx)?;
                self.send(TapOutcome::ShortSingle, &release, false, ctx)?;
            }
            state => {
                log::trace!("Double tap tempo {} ignoring stale timer {timer}", self.id);
                self.state = state;
            }
        }
        Ok(true)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        match &self.state {
            DoubleTapTempoState::Pressed { timer, .. }
            | DoubleTapTempoState::WaitingSecond { timer, .. } => {
                ctx.cancel(*timer);
                self.state = DoubleTapTempoState::Idle;
            }
            _ => (),
        }
        for child in self.children() {
            child.cancel_timers(ctx);
        }
    }
}
