use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind, RemapTarget},
        dispatcher::RuntimeError,
        event::{value::InputValue, Event},
        logical_device::InputType,
    },
};

use super::{Context, Flow, Functor, FunctorBuilder, NodeId, Value};

/// Forwards the incoming value to a logical device input, a key, a mouse
/// button or mouse motion
#[derive(Debug)]
pub struct Remap {
    id: NodeId,
    target: RemapTarget,
    invert: bool,
}

pub fn build(action: &Action, builder: &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError> {
    let ActionKind::Remap(config) = &action.kind else {
        return Err(ConfigError::UnexpectedAction(action.id, "remap"));
    };

    let input = builder.input_type();
    let compatible = match &config.target {
        RemapTarget::Button(_) | RemapTarget::Key { .. } | RemapTarget::MouseButton(_) => {
            input == InputType::Button
        }
        RemapTarget::Axis(_) | RemapTarget::MouseMotion { .. } => input == InputType::Axis,
        RemapTarget::Hat(_) => input == InputType::Hat,
    };
    if !compatible {
        return Err(ConfigError::IncompatibleRemap {
            id: action.id,
            input,
            target: config.target.to_string(),
        });
    }

    match config.target {
        RemapTarget::Button(id) => builder.require_logical(action, InputType::Button, id)?,
        RemapTarget::Axis(id) => builder.require_logical(action, InputType::Axis, id)?,
        RemapTarget::Hat(id) => builder.require_logical(action, InputType::Hat, id)?,
        _ => (),
    }

    Ok(Box::new(Remap {
        id: builder.next_id(),
        target: config.target.clone(),
        invert: config.invert,
    }))
}

impl Functor for Remap {
    fn id(&self) -> NodeId {
        self.id
    }

    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError> {
        let current = value.current;
        match &self.target {
            RemapTarget::Button(id) => {
                let Some(pressed) = current.as_bool() else {
                    return Ok(ignore(event));
                };
                ctx.outputs.set_logical(
                    InputType::Button,
                    *id,
                    InputValue::Bool(pressed != self.invert),
                )?;
            }
            RemapTarget::Axis(id) => {
                let Some(mut axis) = current.as_float() else {
                    return Ok(ignore(event));
                };
                if self.invert {
                    axis = -axis;
                }
                ctx.outputs
                    .set_logical(InputType::Axis, *id, InputValue::Float(axis))?;
            }
            RemapTarget::Hat(id) => {
                let Some(direction) = current.as_hat() else {
                    return Ok(ignore(event));
                };
                ctx.outputs
                    .set_logical(InputType::Hat, *id, InputValue::Hat(direction))?;
            }
            RemapTarget::Key {
                scan_code,
                extended,
            } => {
                let Some(pressed) = current.as_bool() else {
                    return Ok(ignore(event));
                };
                ctx.outputs
                    .emit(Event::key(*scan_code, *extended, pressed != self.invert));
            }
            RemapTarget::MouseButton(button) => {
                let Some(pressed) = current.as_bool() else {
                    return Ok(ignore(event));
                };
                ctx.outputs
                    .emit(Event::mouse_button(*button, pressed != self.invert));
            }
            RemapTarget::MouseMotion { axis, sensitivity } => {
                let Some(delta) = current.as_float() else {
                    return Ok(ignore(event));
                };
                let delta = if self.invert { -delta } else { delta };
                ctx.outputs
                    .emit(Event::mouse_motion(axis.input_id(), delta * sensitivity));
            }
        }
        Ok(Flow::Continue)
    }
}

fn ignore(event: &Event) -> Flow {
    log::trace!("Remap ignoring event with unexpected value: {event:?}");
    Flow::Continue
}
