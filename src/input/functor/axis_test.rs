use std::error::Error;

use crate::{
    config::ConfigError,
    input::{
        action::{
            Action, ActionKind, MergeAxisAction, MergeOperation, ResponseCurveAction,
            SplitAxisAction,
        },
        curve::{CurveConfig, CurveKind, Deadzone},
        event::{value::InputValue, Event, EventType, InputKey},
        functor::{harness::Harness, FunctorBuilder, FunctorRegistry},
        logical_device::{Cell, InputType},
    },
};

fn logical_axis(harness: &Harness, id: u32) -> f64 {
    match harness.outputs.device().get(InputType::Axis, id) {
        Ok(Cell::Axis { value }) => value,
        other => panic!("unexpected cell: {other:?}"),
    }
}

fn merge(operation: MergeOperation) -> Action {
    Action::new(ActionKind::MergeAxis(MergeAxisAction {
        first: InputKey::new("left-pedal", EventType::Axis, 1),
        second: InputKey::new("right-pedal", EventType::Axis, 1),
        operation,
        output: 3,
    }))
}

#[tokio::test]
async fn test_merge_operations() -> Result<(), Box<dyn Error>> {
    let expected = [
        (MergeOperation::Average, 0.0),
        (MergeOperation::Sum, 0.0),
        (MergeOperation::Maximum, -0.5),
        (MergeOperation::Minimum, 0.5),
        (MergeOperation::Bidirectional, -0.5),
    ];
    for (operation, result) in expected {
        let mut harness = Harness::new();
        let mut functor = Harness::build(merge(operation), InputType::Axis);
        harness.send(functor.as_mut(), 0, Event::axis("left-pedal", 1, 1.0));
        harness.send(functor.as_mut(), 0, Event::axis("right-pedal", 1, -1.0));
        assert_eq!(logical_axis(&harness, 3), result, "{operation:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_merge_ignores_unrelated_inputs() -> Result<(), Box<dyn Error>> {
    let mut harness = Harness::new();
    let mut functor = Harness::build(merge(MergeOperation::Sum), InputType::Axis);
    assert_eq!(functor.extra_inputs().len(), 2);

    harness.send(functor.as_mut(), 0, Event::axis("left-pedal", 1, 0.75));
    harness.send(functor.as_mut(), 0, Event::axis("throttle", 1, -1.0));
    assert_eq!(logical_axis(&harness, 3), 0.75);

    // Sums are clamped
    harness.send(functor.as_mut(), 0, Event::axis("right-pedal", 1, 0.75));
    assert_eq!(logical_axis(&harness, 3), 1.0);
    Ok(())
}

#[tokio::test]
async fn test_split_axis() -> Result<(), Box<dyn Error>> {
    let mut harness = Harness::new();
    let action = Action::new(ActionKind::SplitAxis(SplitAxisAction {
        split: 0.0,
        lower: 1,
        upper: 2,
    }));
    let mut functor = Harness::build(action, InputType::Axis);

    harness.send(functor.as_mut(), 0, Event::axis("stick", 1, -1.0));
    assert_eq!(logical_axis(&harness, 1), 1.0);
    assert_eq!(logical_axis(&harness, 2), -1.0);

    harness.send(functor.as_mut(), 0, Event::axis("stick", 1, 0.5));
    assert_eq!(logical_axis(&harness, 1), -1.0);
    assert_eq!(logical_axis(&harness, 2), 0.0);

    harness.send(functor.as_mut(), 0, Event::axis("stick", 1, 0.0));
    assert_eq!(logical_axis(&harness, 1), -1.0);
    assert_eq!(logical_axis(&harness, 2), -1.0);
    Ok(())
}

#[tokio::test]
async fn test_response_curve_shapes_value() -> Result<(), Box<dyn Error>> {
    let mut harness = Harness::new();
    let action = Action::new(ActionKind::ResponseCurve(ResponseCurveAction {
        deadzone: Deadzone {
            low: -1.0,
            center_low: -0.2,
            center_high: 0.2,
            high: 1.0,
        },
        curve: Some(CurveConfig {
            kind: CurveKind::PiecewiseLinear,
            points: vec![[-1.0, -1.0], [0.0, 0.0], [0.5, 0.25], [1.0, 1.0]],
        }),
    }));
    let mut functor = Harness::build(action, InputType::Axis);

    let value = harness.send(functor.as_mut(), 0, Event::axis("stick", 1, 0.1));
    assert_eq!(value.current, InputValue::Float(0.0));

    // 0.6 leaves the deadzone as 0.5 which the curve maps to 0.25
    let value = harness.send(functor.as_mut(), 0, Event::axis("stick", 1, 0.6));
    let shaped = value.current.as_float().unwrap();
    assert!((shaped - 0.25).abs() < 1e-9);

    // Shaping alone never writes outputs
    assert!(harness.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_curve_is_rejected() -> Result<(), Box<dyn Error>> {
    let registry = FunctorRegistry::default();
    let mut builder = FunctorBuilder::new(&registry, Default::default());
    let action = Action::new(ActionKind::ResponseCurve(ResponseCurveAction {
        deadzone: Deadzone::default(),
        curve: Some(CurveConfig {
            kind: CurveKind::CubicBezier,
            points: vec![[-1.0, -1.0], [1.0, 1.0]],
        }),
    }));
    let result = builder.build_root(&action, InputType::Axis);
    assert!(matches!(result, Err(ConfigError::MalformedCurve(..))));
    Ok(())
}
