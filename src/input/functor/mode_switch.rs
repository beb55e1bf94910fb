//! Functors changing engine state: mode switches and pausing
use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind, PauseOperation},
        dispatcher::RuntimeError,
        event::Event,
    },
};

use super::{Context, EngineRequest, Flow, Functor, FunctorBuilder, NodeId, Value};

#[derive(Debug, Clone, PartialEq)]
enum ModeOperation {
    Switch(String),
    Temporary(String),
    Cycle(Vec<String>),
    Previous,
}

/// Requests a mode change when pressed
#[derive(Debug)]
pub struct ModeSwitch {
    id: NodeId,
    operation: ModeOperation,
    /// A temporary mode was pushed and awaits the release
    pushed: bool,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let operation = match &action.kind {
        ActionKind::SwitchMode(target) => ModeOperation::Switch(target.mode.clone()),
        ActionKind::TemporaryMode(target) => ModeOperation::Temporary(target.mode.clone()),
        ActionKind::CycleModes(config) => ModeOperation::Cycle(config.modes.clone()),
        ActionKind::PreviousMode => ModeOperation::Previous,
        kind => return Err(ConfigError::UnexpectedAction(action.id, kind.tag())),
    };
    builder.require_button(action)?;
    Ok(Box::new(ModeSwitch {
        id: builder.next_id(),
        operation,
        pushed: false,
    }))
}

impl Functor for ModeSwitch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        _event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let Some(pressed) = value.current.as_bool() else {
            return Ok(Flow::Continue);
        };

        match (&self.operation, pressed) {
            (ModeOperation::Switch(mode), true) => {
                ctx.request(EngineRequest::SwitchMode(mode.clone()))
            }
            (ModeOperation::Temporary(mode), true) => {
                if !self.pushed {
                    self.pushed = true;
                    ctx.request(EngineRequest::PushTemporaryMode(mode.clone()));
                }
            }
            (ModeOperation::Temporary(_), false) => {
                if self.pushed {
                    self.pushed = false;
                    ctx.request(EngineRequest::PopTemporaryMode);
                }
            }
            (ModeOperation::Cycle(modes), true) => {
                ctx.request(EngineRequest::CycleModes(modes.clone()))
            }
            (ModeOperation::Previous, true) => ctx.request(EngineRequest::PreviousMode),
            _ => (),
        }
        Ok(Flow::Continue)
    }
}

/// Pauses or resumes input processing. Keeps running while paused.
#[derive(Debug)]
pub struct PauseResume {
    id: NodeId,
    operation: PauseOperation,
}

pub fn build_pause(
    action: &Action,
    builder: &mut FunctorBuilder,
) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::PauseResume(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "pause_resume"));
    };
    builder.require_button(action)?;
    Ok(Box::new(PauseResume {
        id: builder.next_id(),
        operation: config.operation,
    }))
}

impl Functor for PauseResume {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        _event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        if value.current.as_bool() != Some(true) {
            return Ok(Flow::Continue);
        }
        let request = match self.operation {
            PauseOperation::Pause => EngineRequest::Pause,
            PauseOperation::Resume => EngineRequest::Resume,
            PauseOperation::Toggle => EngineRequest::TogglePause,
        };
        ctx.request(request);
        Ok(Flow::Continue)
    }

    fn is_pause_control(&self) -> bool {
        true
    }
}
