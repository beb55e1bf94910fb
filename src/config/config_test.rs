use std::error::Error;

use tokio::fs;

use crate::{
    config::{ConfigError, LoadError, Profile},
    input::{
        action::{ActionKind, Behavior, MotionAxis, RemapTarget},
        dispatcher::Engine,
        event::EventType,
        macros::MacroAction,
    },
};

const PROFILE_DIR: &str = "./rootfs/usr/share/joyweave/profiles";

const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const ENDCOLOR: &str = "\x1b[0m";

const HEADER: &str = r#"
version: 1
kind: Profile
name: Test
"#;

fn load(body: &str) -> Result<Profile, LoadError> {
    Profile::from_yaml(format!("{HEADER}{body}"))
}

fn config_error(body: &str) -> ConfigError {
    match load(body) {
        Err(LoadError::ConfigError(e)) => e,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

/// Every shipped profile must load and build
#[tokio::test]
async fn check_shipped_profiles() -> Result<(), Box<dyn Error>> {
    let mut failures = Vec::new();
    let mut dir = fs::read_dir(PROFILE_DIR).await?;
    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        println!("Checking profile {CYAN}{path:?}{ENDCOLOR}");
        let result = Profile::from_yaml_file(&path)
            .map_err(|e| e.to_string())
            .and_then(|profile| Engine::new(&profile).map_err(|e| e.to_string()));
        if let Err(e) = result {
            println!("  {RED}{e}{ENDCOLOR}");
            failures.push(path);
        }
    }
    assert!(failures.is_empty(), "invalid profiles: {failures:?}");
    Ok(())
}

#[tokio::test]
async fn test_start_mode_defaults_to_first_mode() -> Result<(), Box<dyn Error>> {
    let profile = load("modes:\n  - name: first\n  - name: second\n")?;
    assert_eq!(profile.start_mode(), Some("first"));
    assert_eq!(profile.settings.default_delay, 0.05);
    assert_eq!(profile.settings.logical_device.buttons, 128);
    Ok(())
}

#[tokio::test]
async fn test_invalid_modes() -> Result<(), Box<dyn Error>> {
    assert_eq!(config_error("modes: []\n"), ConfigError::NoModes);
    assert_eq!(
        config_error("modes:\n  - name: a\n  - name: a\n"),
        ConfigError::DuplicateMode("a".to_string())
    );
    assert_eq!(
        config_error("start_mode: b\nmodes:\n  - name: a\n"),
        ConfigError::UnknownMode("b".to_string())
    );
    assert_eq!(
        config_error("modes:\n  - name: a\n    parent: ghost\n"),
        ConfigError::UnknownMode("ghost".to_string())
    );
    assert_eq!(
        config_error("modes:\n  - name: a\n    parent: b\n  - name: b\n    parent: a\n"),
        ConfigError::ModeCycle("a".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_mode_reference() -> Result<(), Box<dyn Error>> {
    let body = r#"
modes:
  - name: a
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        actions:
          - type: tempo
            short: { type: switch_mode, mode: a }
            long: { type: cycle_modes, modes: [a, nowhere] }
"#;
    assert_eq!(
        config_error(body),
        ConfigError::UnknownMode("nowhere".to_string())
    );

    let body = "modes:\n  - name: a\nauto_switch:\n  - { process: game, mode: b }\n";
    assert_eq!(config_error(body), ConfigError::UnknownMode("b".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_invalid_behaviors() -> Result<(), Box<dyn Error>> {
    let body = r#"
modes:
  - name: a
    bindings:
      - input: { device_guid: stick, event_type: button, input_id: 1 }
        behavior: { axis_button: { low: 0.0, high: 1.0 } }
        actions: []
"#;
    let ConfigError::InvalidBehavior(key, _) = config_error(body) else {
        panic!("expected an invalid behavior");
    };
    assert_eq!(key.event_type, EventType::Button);

    let body = r#"
modes:
  - name: a
    bindings:
      - input: { device_guid: stick, event_type: hat, input_id: 1 }
        behavior: { hat_button: { directions: [] } }
        actions: []
"#;
    assert!(matches!(
        config_error(body),
        ConfigError::InvalidBehavior(..)
    ));
    Ok(())
}

/// Enum variants with fields are written as single key maps at any depth
#[tokio::test]
async fn test_variants_with_fields() -> Result<(), Box<dyn Error>> {
    let profile = load(
        r#"
modes:
  - name: a
    bindings:
      - input: { device_guid: stick, event_type: axis, input_id: 2 }
        behavior: { axis_button: { low: 0.9, high: 1.0 } }
        actions:
          - type: remap
            target: { key: { scan_code: 42 } }
          - type: macro
            actions:
              - key: { scan_code: 30, pressed: true }
              - pause: { duration: 0.1 }
              - key: { scan_code: 30, pressed: false }
      - input: { device_guid: stick, event_type: axis, input_id: 1 }
        actions:
          - type: remap
            target: { mouse_motion: { axis: x } }
"#,
    )?;

    let bindings = &profile.modes[0].bindings;
    assert_eq!(
        bindings[0].behavior,
        Behavior::AxisButton {
            low: 0.9,
            high: 1.0
        }
    );
    let ActionKind::Remap(remap) = &bindings[0].actions[0].kind else {
        panic!("expected a remap action");
    };
    assert_eq!(
        remap.target,
        RemapTarget::Key {
            scan_code: 42,
            extended: false
        }
    );
    let ActionKind::Macro(macro_) = &bindings[0].actions[1].kind else {
        panic!("expected a macro action");
    };
    assert_eq!(macro_.actions[1], MacroAction::Pause { duration: 0.1 });
    let ActionKind::Remap(remap) = &bindings[1].actions[0].kind else {
        panic!("expected a remap action");
    };
    assert!(matches!(
        remap.target,
        RemapTarget::MouseMotion {
            axis: MotionAxis::X,
            ..
        }
    ));

    Engine::new(&profile)?;
    Ok(())
}

#[tokio::test]
async fn test_incompatible_remap_fails_to_build() -> Result<(), Box<dyn Error>> {
    let body = r#"
modes:
  - name: a
    bindings:
      - input: { device_guid: stick, event_type: axis, input_id: 1 }
        actions:
          - type: remap
            target: { button: 1 }
"#;
    let profile = load(body)?;
    assert!(matches!(
        Engine::new(&profile),
        Err(ConfigError::IncompatibleRemap { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_malformed_yaml() -> Result<(), Box<dyn Error>> {
    let result = Profile::from_yaml("modes: [".to_string());
    assert!(matches!(result, Err(LoadError::DeserializeError(_))));
    Ok(())
}

#[tokio::test]
async fn test_auto_switch_globs() -> Result<(), Box<dyn Error>> {
    let profile = load(
        r#"
modes:
  - name: a
  - name: b
auto_switch:
  - { process: "elite*", mode: b }
  - { process: "*", mode: a }
"#,
    )?;
    assert_eq!(profile.auto_switch_mode("EliteDangerous64.exe"), Some("a"));
    assert_eq!(profile.auto_switch_mode("elite-dangerous"), Some("b"));
    Ok(())
}
