use std::error::Error;

use crate::input::{
    event::{EventType, InputKey},
    mode::{Mode, ModeError, ModeManager},
};

fn key(id: u32) -> InputKey {
    InputKey::new("stick", EventType::Button, id)
}

fn manager() -> ModeManager {
    let mut base = Mode::new("Base", None);
    base.bind(key(1), 0);
    base.bind(key(2), 1);
    let mut child = Mode::new("Child", Some("Base".to_string()));
    child.bind(key(2), 2);
    let grandchild = Mode::new("Grandchild", Some("Child".to_string()));
    let other = Mode::new("Other", None);
    ModeManager::new(vec![base, child, grandchild, other], "Base").unwrap()
}

#[tokio::test]
async fn test_inheritance_lookup() -> Result<(), Box<dyn Error>> {
    let mut modes = manager();
    modes.switch_to("Grandchild")?;

    // Bound only in the root mode
    let (mode, bound) = modes.resolve(&key(1)).unwrap();
    assert_eq!(mode, "Base");
    assert_eq!(bound, &[0]);

    // Overridden by the child, the parent binding is not merged in
    let (mode, bound) = modes.resolve(&key(2)).unwrap();
    assert_eq!(mode, "Child");
    assert_eq!(bound, &[2]);

    assert!(modes.resolve(&key(3)).is_none());

    modes.switch_to("Other")?;
    assert!(modes.resolve(&key(1)).is_none());
    Ok(())
}

#[tokio::test]
async fn test_missing_parent_is_no_binding() -> Result<(), Box<dyn Error>> {
    let orphan = Mode::new("Orphan", Some("Ghost".to_string()));
    let modes = ModeManager::new(vec![orphan], "Orphan")?;
    assert!(modes.resolve(&key(1)).is_none());
    assert_eq!(modes.inheritance_chain("Orphan"), vec!["Orphan".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_parent_cycle_terminates() -> Result<(), Box<dyn Error>> {
    let a = Mode::new("A", Some("B".to_string()));
    let b = Mode::new("B", Some("A".to_string()));
    let modes = ModeManager::new(vec![a, b], "A")?;
    assert_eq!(modes.inheritance_chain("A"), vec!["A".to_string(), "B".to_string()]);
    assert!(modes.resolve(&key(1)).is_none());
    Ok(())
}

#[tokio::test]
async fn test_switch_records_previous() -> Result<(), Box<dyn Error>> {
    let mut modes = manager();
    let change = modes.switch_to("Other")?.unwrap();
    assert_eq!(change.from, "Base");
    assert_eq!(change.to, "Other");
    assert_eq!(change.deactivated, vec!["Base".to_string()]);
    assert_eq!(modes.current(), "Other");
    assert_eq!(modes.previous(), "Base");

    assert!(modes.switch_to("Other")?.is_none());

    modes.switch_to_previous()?;
    assert_eq!(modes.current(), "Base");
    assert_eq!(modes.previous(), "Other");

    assert_eq!(
        modes.switch_to("Missing"),
        Err(ModeError::UnknownMode("Missing".to_string()))
    );
    assert_eq!(modes.current(), "Base");
    Ok(())
}

#[tokio::test]
async fn test_child_switch_keeps_ancestors_active() -> Result<(), Box<dyn Error>> {
    let mut modes = manager();
    let change = modes.switch_to("Grandchild")?.unwrap();
    assert!(change.deactivated.is_empty());

    let change = modes.switch_to("Base")?.unwrap();
    assert_eq!(
        change.deactivated,
        vec!["Grandchild".to_string(), "Child".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_temporary_stack() -> Result<(), Box<dyn Error>> {
    let mut modes = manager();
    modes.push_temporary("Child")?;
    modes.push_temporary("Other")?;
    assert_eq!(modes.current(), "Other");
    assert_eq!(modes.temporary_stack(), &["Child".to_string(), "Other".to_string()]);

    modes.pop_temporary();
    assert_eq!(modes.current(), "Child");
    modes.pop_temporary();
    assert_eq!(modes.current(), "Base");
    assert!(modes.pop_temporary().is_none());
    assert_eq!(modes.current(), "Base");

    // A permanent switch discards temporary modes
    modes.push_temporary("Child")?;
    modes.switch_to("Other")?;
    assert!(modes.temporary_stack().is_empty());
    assert!(modes.pop_temporary().is_none());
    assert_eq!(modes.current(), "Other");
    Ok(())
}

#[tokio::test]
async fn test_cycle() -> Result<(), Box<dyn Error>> {
    let mut modes = manager();
    let list = vec!["Child".to_string(), "Other".to_string()];

    // Not in the list: jump to the first entry
    modes.cycle(&list)?;
    assert_eq!(modes.current(), "Child");
    modes.cycle(&list)?;
    assert_eq!(modes.current(), "Other");
    modes.cycle(&list)?;
    assert_eq!(modes.current(), "Child");

    assert!(modes.cycle(&[])?.is_none());
    assert_eq!(modes.current(), "Child");
    Ok(())
}
