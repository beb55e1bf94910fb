use std::{
    error::Error,
    time::{Duration, Instant},
};

use tokio::sync::broadcast;

use crate::{
    config::{from_yaml_str, ConfigError, Profile},
    input::{
        dispatcher::Engine,
        event::{value::HatDirection, Event, EventType},
        logical_device::{Cell, InputType},
    },
};

const HEADER: &str = r#"
version: 1
kind: Profile
name: Test
"#;

fn profile(body: &str) -> Profile {
    Profile::from_yaml(format!("{HEADER}{body}")).unwrap()
}

struct Clock(Instant);

impl Clock {
    fn at(&self, millis: u64) -> Instant {
        self.0 + Duration::from_millis(millis)
    }
}

fn buttons(rx: &mut broadcast::Receiver<Event>) -> Vec<(u32, bool)> {
    let mut buttons = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.event_type == EventType::Button {
            buttons.push((event.input_id, event.value.pressed()));
        }
    }
    buttons
}

fn press(engine: &mut Engine, at: Instant, id: u32, pressed: bool) {
    engine
        .process_event(Event::button("stick", id, pressed), at)
        .unwrap();
}

fn tap(engine: &mut Engine, clock: &Clock, id: u32, press_at: u64, release_at: u64) {
    press(engine, clock.at(press_at), id, true);
    press(engine, clock.at(release_at), id, false);
}

fn axis(engine: &Engine, id: u32) -> f64 {
    match engine.logical_device().get(InputType::Axis, id) {
        Ok(Cell::Axis { value }) => value,
        other => panic!("unexpected cell: {other:?}"),
    }
}

#[tokio::test]
async fn test_child_mode_inherits_bindings() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
start_mode: child
modes:
  - name: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
      - input: { device_guid: stick, event_type: button, input_id: 2 }
        actions:
          - type: remap
            target: { button: 2 }
  - name: child
    parent: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 2 }
        actions:
          - type: remap
            target: { button: 5 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();
    assert_eq!(engine.current_mode(), "child");

    press(&mut engine, clock.at(0), 1, true);
    press(&mut engine, clock.at(0), 2, true);
    assert_eq!(buttons(&mut rx), vec![(1, true), (5, true)]);
    Ok(())
}

#[tokio::test]
async fn test_events_are_stamped_with_mode() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: flight
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
"#,
    );
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    press(&mut engine, Instant::now(), 1, true);
    let event = rx.try_recv()?;
    assert_eq!(event.mode, "flight");
    Ok(())
}

#[tokio::test]
async fn test_chain_restarts_after_timeout() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: chain
            timeout: 0.2
            children:
              - type: remap
                target: { button: 1 }
              - type: remap
                target: { button: 2 }
              - type: remap
                target: { button: 3 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    tap(&mut engine, &clock, 1, 0, 10);
    tap(&mut engine, &clock, 1, 100, 110);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false), (2, true), (2, false)]);

    tap(&mut engine, &clock, 1, 400, 410);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);
    Ok(())
}

#[tokio::test]
async fn test_tempo_uses_engine_timers() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: tempo
            threshold: 0.2
            short:
              type: remap
              target: { button: 1 }
            long:
              type: remap
              target: { button: 2 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    press(&mut engine, clock.at(0), 1, true);
    assert_eq!(engine.next_deadline(), Some(clock.at(200)));
    engine.run_timers(clock.at(199))?;
    assert!(buttons(&mut rx).is_empty());
    engine.run_timers(clock.at(250))?;
    assert_eq!(buttons(&mut rx), vec![(2, true)]);
    press(&mut engine, clock.at(300), 1, false);
    assert_eq!(buttons(&mut rx), vec![(2, false)]);
    assert_eq!(engine.next_deadline(), None);

    // Due timers fire before the event that follows them
    tap(&mut engine, &clock, 1, 1000, 1100);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);
    Ok(())
}

#[tokio::test]
async fn test_double_tap_through_engine() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: double_tap
            window: 0.3
            single:
              type: remap
              target: { button: 1 }
            double:
              type: remap
              target: { button: 2 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    tap(&mut engine, &clock, 1, 0, 50);
    tap(&mut engine, &clock, 1, 100, 150);
    assert_eq!(buttons(&mut rx), vec![(2, true), (2, false)]);

    tap(&mut engine, &clock, 1, 1000, 1050);
    engine.run_timers(clock.at(1400))?;
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);
    Ok(())
}

#[tokio::test]
async fn test_merged_axes() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: left-pedal, event_type: axis, input_id: 1 }
        actions:
          - type: merge_axis
            first: { device_guid: left-pedal, event_type: axis, input_id: 1 }
            second: { device_guid: right-pedal, event_type: axis, input_id: 1 }
            operation: bidirectional
            output: 3
"#,
    );
    let now = Instant::now();
    let mut engine = Engine::new(&profile)?;

    // The second input reaches the functor although it has no binding
    engine.process_event(Event::axis("right-pedal", 1, -1.0), now)?;
    assert_eq!(axis(&engine, 3), -0.25);
    engine.process_event(Event::axis("left-pedal", 1, 1.0), now)?;
    assert_eq!(axis(&engine, 3), -0.5);
    Ok(())
}

#[tokio::test]
async fn test_nested_merged_axes() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: left-pedal, event_type: axis, input_id: 1 }
        actions:
          - type: condition
            condition: { all: [] }
            when_true:
              - type: chain
                children:
                  - type: merge_axis
                    first: { device_guid: left-pedal, event_type: axis, input_id: 1 }
                    second: { device_guid: right-pedal, event_type: axis, input_id: 1 }
                    operation: bidirectional
                    output: 3
"#,
    );
    let now = Instant::now();
    let mut engine = Engine::new(&profile)?;

    engine.process_event(Event::axis("right-pedal", 1, -1.0), now)?;
    assert_eq!(axis(&engine, 3), -0.25);
    engine.process_event(Event::axis("left-pedal", 1, 1.0), now)?;
    assert_eq!(axis(&engine, 3), -0.5);
    Ok(())
}

#[tokio::test]
async fn test_hat_hold_macro() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: hat, input_id: 1 }
        behavior:
          hat_button:
            directions: [north]
        actions:
          - type: macro
            actions:
              - joystick:
                  input_type: axis
                  input_id: 1
                  value: { float: 0.1 }
                  relative: true
            repeat:
              type: hold
              delay: 0.05
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;

    engine.process_event(Event::hat("stick", 1, HatDirection::North), clock.at(0))?;
    assert!((axis(&engine, 1) - 0.1).abs() < 1e-9);
    engine.run_timers(clock.at(50))?;
    assert!((axis(&engine, 1) - 0.2).abs() < 1e-9);
    engine.run_timers(clock.at(100))?;
    assert!((axis(&engine, 1) - 0.3).abs() < 1e-9);

    engine.process_event(Event::hat("stick", 1, HatDirection::Center), clock.at(120))?;
    assert!(engine.macros().running().is_empty());
    engine.run_timers(clock.at(1000))?;
    assert!((axis(&engine, 1) - 0.3).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_axis_button_fires_on_transitions() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: axis, input_id: 2 }
        behavior:
          axis_button: { low: 0.5, high: 1.0 }
        actions:
          - type: remap
            target: { button: 4 }
"#,
    );
    let now = Instant::now();
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    for value in [0.2, 0.6, 0.8, 1.0, 0.1, 0.0] {
        engine.process_event(Event::axis("stick", 2, value), now)?;
    }
    assert_eq!(buttons(&mut rx), vec![(4, true), (4, false)]);
    Ok(())
}

const PAUSABLE: &str = r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
      - input: { device_guid: stick, event_type: button, input_id: 8 }
        actions:
          - type: pause_resume
            operation: toggle
"#;

#[tokio::test]
async fn test_pause_blocks_everything_but_pause_controls() -> Result<(), Box<dyn Error>> {
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile(PAUSABLE))?;
    let mut rx = engine.subscribe();

    tap(&mut engine, &clock, 8, 0, 10);
    assert!(engine.is_paused());
    tap(&mut engine, &clock, 1, 20, 30);
    assert!(buttons(&mut rx).is_empty());

    tap(&mut engine, &clock, 8, 40, 50);
    assert!(!engine.is_paused());
    tap(&mut engine, &clock, 1, 60, 70);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);
    Ok(())
}

#[tokio::test]
async fn test_release_reaches_functor_while_paused() -> Result<(), Box<dyn Error>> {
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile(PAUSABLE))?;
    let mut rx = engine.subscribe();

    press(&mut engine, clock.at(0), 1, true);
    tap(&mut engine, &clock, 8, 10, 20);
    press(&mut engine, clock.at(30), 1, false);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);
    Ok(())
}

#[tokio::test]
async fn test_release_follows_press_across_mode_switch() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
      - input: { device_guid: stick, event_type: button, input_id: 2 }
        actions:
          - type: switch_mode
            mode: other
  - name: other
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 3 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    press(&mut engine, clock.at(0), 1, true);
    tap(&mut engine, &clock, 2, 10, 20);
    assert_eq!(engine.current_mode(), "other");
    assert_eq!(engine.previous_mode(), "base");

    // The release goes to the functor that saw the press
    press(&mut engine, clock.at(30), 1, false);
    assert_eq!(buttons(&mut rx), vec![(1, true), (1, false)]);

    tap(&mut engine, &clock, 1, 40, 50);
    assert_eq!(buttons(&mut rx), vec![(3, true), (3, false)]);
    Ok(())
}

#[tokio::test]
async fn test_temporary_mode_while_held() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
      - input: { device_guid: stick, event_type: button, input_id: 9 }
        actions:
          - type: temporary_mode
            mode: shift
  - name: shift
    parent: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 2 }
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    press(&mut engine, clock.at(0), 9, true);
    assert_eq!(engine.current_mode(), "shift");
    tap(&mut engine, &clock, 1, 10, 20);
    press(&mut engine, clock.at(30), 9, false);
    assert_eq!(engine.current_mode(), "base");
    tap(&mut engine, &clock, 1, 40, 50);
    assert_eq!(
        buttons(&mut rx),
        vec![(2, true), (2, false), (1, true), (1, false)]
    );
    Ok(())
}

#[tokio::test]
async fn test_mode_operations() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: a
  - name: b
  - name: c
auto_switch:
  - process: "*racer*"
    mode: c
"#,
    );
    let now = Instant::now();
    let mut engine = Engine::new(&profile)?;
    assert_eq!(engine.mode_names(), vec!["a", "b", "c"]);

    let cycle = vec!["a".to_string(), "b".to_string()];
    engine.cycle_modes(&cycle, now)?;
    assert_eq!(engine.current_mode(), "b");
    engine.cycle_modes(&cycle, now)?;
    assert_eq!(engine.current_mode(), "a");

    let selected = engine.set_focused_process("dirt-racer.exe", now)?;
    assert_eq!(selected.as_deref(), Some("c"));
    assert_eq!(engine.current_mode(), "c");
    assert_eq!(engine.set_focused_process("editor", now)?, None);
    assert_eq!(engine.current_mode(), "c");

    engine.switch_to_previous_mode(now)?;
    assert_eq!(engine.current_mode(), "a");
    assert!(engine.switch_mode("missing", now).is_err());
    assert_eq!(engine.current_mode(), "a");
    Ok(())
}

#[tokio::test]
async fn test_mode_switch_cancels_pending_timers() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: base
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: tempo
            short:
              type: remap
              target: { button: 1 }
            long:
              type: remap
              target: { button: 2 }
  - name: other
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let mut rx = engine.subscribe();

    press(&mut engine, clock.at(0), 1, true);
    assert!(engine.next_deadline().is_some());
    engine.switch_mode("other", clock.at(10))?;
    assert_eq!(engine.next_deadline(), None);
    engine.run_timers(clock.at(5000))?;
    assert!(buttons(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_queue_and_terminate_macro() -> Result<(), Box<dyn Error>> {
    let profile = profile(
        r#"
modes:
  - name: default
"#,
    );
    let clock = Clock(Instant::now());
    let mut engine = Engine::new(&profile)?;
    let macro_ = from_yaml_str(
        r#"
actions:
  - joystick: { input_type: button, input_id: 3, value: { bool: true } }
repeat:
  type: toggle
"#,
    )?;

    let id = engine.queue_macro(macro_, clock.at(0))?;
    assert!(engine.macros().is_running(id));
    assert!(engine.terminate_macro(id));
    assert!(!engine.terminate_macro(id));
    assert_eq!(engine.next_deadline(), None);
    Ok(())
}

#[tokio::test]
async fn test_unbuildable_profile_is_rejected() -> Result<(), Box<dyn Error>> {
    let valid = profile(PAUSABLE);
    let broken = profile(
        r#"
modes:
  - name: default
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: remap
            target: { button: 500 }
"#,
    );
    assert!(matches!(
        Engine::new(&broken),
        Err(ConfigError::UnknownLogicalInput(_, InputType::Button, 500))
    ));

    let now = Instant::now();
    let mut engine = Engine::new(&valid)?;
    assert!(engine.load_profile(&broken, now).is_err());
    assert_eq!(engine.current_mode(), "default");

    // The loaded profile keeps working
    let mut rx = engine.subscribe();
    press(&mut engine, now, 1, true);
    assert_eq!(buttons(&mut rx), vec![(1, true)]);
    Ok(())
}
