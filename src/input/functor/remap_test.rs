use std::error::Error;

use crate::{
    config::ConfigError,
    input::{
        action::{Action, ActionKind, MotionAxis, RemapAction, RemapTarget},
        event::{value::HatDirection, Event, EventType},
        functor::{
            harness::{remap_axis, remap_button, Harness, DEVICE},
            FunctorBuilder, FunctorRegistry,
        },
        logical_device::{Cell, InputType},
    },
};

fn remap(target: RemapTarget, invert: bool) -> Action {
    Action::new(ActionKind::Remap(RemapAction { target, invert }))
}

#[tokio::test]
async fn test_remap_button_and_axis() -> Result<(), Box<dyn Error>> {
    let mut harness = Harness::new();
    let mut button = Harness::build(remap_button(4), InputType::Button);
    harness.button(button.as_mut(), 0, true);
    assert_eq!(harness.buttons(), vec![(4, true)]);
    assert_eq!(
        harness.outputs.device().get(InputType::Button, 4)?,
        Cell::Button { is_pressed: true }
    );

    let mut axis = Harness::build(remap(RemapTarget::Axis(2), true), InputType::Axis);
    harness.send(axis.as_mut(), 0, Event::axis(DEVICE, 1, 0.25));
    assert_eq!(
        harness.outputs.device().get(InputType::Axis, 2)?,
        Cell::Axis { value: -0.25 }
    );

    let mut plain = Harness::build(remap_axis(3), InputType::Axis);
    harness.send(plain.as_mut(), 0, Event::axis(DEVICE, 1, 1.5));
    assert_eq!(
        harness.outputs.device().get(InputType::Axis, 3)?,
        Cell::Axis { value: 1.0 }
    );
    Ok(())
}

#[tokio::test]
async fn test_remap_hat_key_and_mouse() -> Result<(), Box<dyn Error>> {
    let mut harness = Harness::new();
    let mut hat = Harness::build(remap(RemapTarget::Hat(1), false), InputType::Hat);
    harness.send(hat.as_mut(), 0, Event::hat(DEVICE, 1, HatDirection::West));
    assert_eq!(
        harness.outputs.device().get(InputType::Hat, 1)?,
        Cell::Hat {
            direction: HatDirection::West
        }
    );
    harness.drain();

    let mut key = Harness::build(
        remap(
            RemapTarget::Key {
                scan_code: 0x1d,
                extended: true,
            },
            false,
        ),
        InputType::Button,
    );
    harness.button(key.as_mut(), 0, true);
    assert_eq!(harness.drain(), vec![Event::key(0x1d, true, true)]);

    let mut motion = Harness::build(
        remap(
            RemapTarget::MouseMotion {
                axis: MotionAxis::Y,
                sensitivity: 10.0,
            },
            false,
        ),
        InputType::Axis,
    );
    harness.send(motion.as_mut(), 0, Event::axis(DEVICE, 2, 0.5));
    let events = harness.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::MouseMotion);
    assert_eq!(events[0].input_id, 1);
    assert_eq!(events[0].value.as_float(), Some(5.0));
    Ok(())
}

#[tokio::test]
async fn test_incompatible_remap_is_rejected() -> Result<(), Box<dyn Error>> {
    let registry = FunctorRegistry::default();
    let mut builder = FunctorBuilder::new(&registry, Default::default());

    let action = remap(RemapTarget::Axis(1), false);
    let result = builder.build_root(&action, InputType::Button);
    assert!(matches!(
        result,
        Err(ConfigError::IncompatibleRemap {
            input: InputType::Button,
            ..
        })
    ));

    let action = remap_button(1000);
    let result = builder.build_root(&action, InputType::Button);
    assert!(matches!(
        result,
        Err(ConfigError::UnknownLogicalInput(_, InputType::Button, 1000))
    ));
    Ok(())
}
