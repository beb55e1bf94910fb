use std::error::Error;

use tokio::sync::broadcast;

use crate::input::{
    event::{value::InputValue, Event, EventType},
    target::json::JsonLinesTarget,
};

#[tokio::test]
async fn test_writes_one_event_per_line() -> Result<(), Box<dyn Error>> {
    let (tx, rx) = broadcast::channel(16);
    let mut target = JsonLinesTarget::new(Vec::new(), rx);

    tx.send(Event::logical(EventType::Button, 3, InputValue::Bool(true)).with_mode("default"))?;
    tx.send(Event::logical(EventType::Axis, 1, InputValue::Float(0.25)))?;
    drop(tx);

    assert_eq!(target.run().await?, 2);
    let output = String::from_utf8(target.into_inner())?;
    let events: Vec<Event> = output
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].input_id, 3);
    assert_eq!(events[0].mode, "default");
    assert_eq!(events[1].value, InputValue::Float(0.25));
    Ok(())
}
