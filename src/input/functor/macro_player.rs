use std::sync::Arc;

use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind},
        dispatcher::RuntimeError,
        event::Event,
        logical_device::InputType,
        macros::{Macro, MacroAction, PlaybackId, RepeatPolicy},
    },
};

use super::{Context, Flow, Functor, FunctorBuilder, NodeId, Value};

/// Starts (and for hold and toggle macros, stops) a macro playback
#[derive(Debug)]
pub struct MacroPlayer {
    id: NodeId,
    macro_: Arc<Macro>,
    playback: Option<PlaybackId>,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::Macro(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "macro"));
    };
    builder.require_button(action)?;
    for step in config.actions.iter() {
        match step {
            MacroAction::Joystick {
                input_type,
                input_id,
                relative,
                ..
            } => {
                builder.require_logical(action, *input_type, *input_id)?;
                if *relative && *input_type != InputType::Axis {
                    return Err(ConfigError::InvalidParameter(
                        action.id,
                        format!("only axes accept relative values, not {input_type}"),
                    ));
                }
            }
            MacroAction::Pause { duration } if duration.is_nan() || *duration < 0.0 => {
                return Err(ConfigError::InvalidParameter(
                    action.id,
                    format!("invalid pause duration {duration}"),
                ));
            }
            _ => (),
        }
    }
    if let RepeatPolicy::Count { count: 0, .. } = config.repeat {
        return Err(ConfigError::InvalidParameter(
            action.id,
            "repeat count must be at least 1".to_string(),
        ));
    }

    Ok(Box::new(MacroPlayer {
        id: builder.next_id(),
        macro_: Arc::new(config.clone()),
        playback: None,
    }))
}

impl MacroPlayer {
    fn start(&mut self, ctx: &mut Context) -> Result<(), RuntimeError> {
        let id = ctx
            .macros
            .queue_macro(self.macro_.clone(), ctx.now, ctx.timers, ctx.outputs)?;
        self.playback = Some(id);
        Ok(())
    }

    fn stop(&mut self, ctx: &mut Context) {
        if let Some(id) = self.playback.take() {
            ctx.macros.terminate_macro(id, ctx.timers);
        }
    }

    fn is_playing(&self, ctx: &Context) -> bool {
        self.playback
            .map(|id| ctx.macros.is_running(id))
            .unwrap_or(false)
    }
}

impl Functor for MacroPlayer {
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

        match (&self.macro_.repeat, pressed) {
            (RepeatPolicy::Toggle { .. }, true) => {
                if self.is_playing(ctx) {
                    self.stop(ctx);
                } else {
                    self.start(ctx)?;
                }
            }
            (RepeatPolicy::Hold { .. }, false) => self.stop(ctx),
            (RepeatPolicy::Toggle { .. }, false) => (),
            (_, true) => self.start(ctx)?,
            (_, false) => (),
        }
        Ok(Flow::Continue)
    }

    fn cancel_timers(&mut self, ctx: &mut Context) {
        self.stop(ctx);
    }
}
