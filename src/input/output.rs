use tokio::sync::broadcast;

use super::{
    event::{value::InputValue, Event, EventType},
    logical_device::{Cell, InputType, LogicalDevice, LogicalDeviceError},
};

/// Size of the emitted event buffer. Slow subscribers lag instead of
/// blocking the dispatch task.
pub const BUFFER_SIZE: usize = 2048;

/// Everything functors and macros write to: the logical device and the
/// stream of emitted events. Every write to the logical device produces an
/// event carrying the stored value.
#[derive(Debug)]
pub struct Outputs {
    device: LogicalDevice,
    events: broadcast::Sender<Event>,
    mode: String,
}

impl Outputs {
    pub fn new(device: LogicalDevice, events: broadcast::Sender<Event>) -> Self {
        Self {
            device,
            events,
            mode: String::new(),
        }
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut LogicalDevice {
        &mut self.device
    }

    pub fn sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    /// Set the mode name stamped on emitted events
    pub fn set_mode(&mut self, mode: &str) {
        self.mode = mode.to_string();
    }

    /// Emit the given event to all subscribers
    pub fn emit(&self, event: Event) {
        let event = event.with_mode(&self.mode);
        log::trace!("Emitting event: {event:?}");
        if self.events.send(event).is_err() {
            log::trace!("No subscribers for emitted event");
        }
    }

    /// Write a logical device input and emit the stored value
    pub fn set_logical(
        &mut self,
        input_type: InputType,
        input_id: u32,
        value: InputValue,
    ) -> Result<Cell, LogicalDeviceError> {
        let cell = self.device.update(input_type, input_id, value)?;
        self.emit(Event::logical(
            event_type_for(input_type),
            input_id,
            cell.as_value(),
        ));
        Ok(cell)
    }

    /// Offset a logical axis and emit its new value
    pub fn nudge_axis(&mut self, input_id: u32, delta: f64) -> Result<f64, LogicalDeviceError> {
        let value = self.device.set_axis_relative(input_id, delta)?;
        self.emit(Event::logical(
            EventType::Axis,
            input_id,
            InputValue::Float(value),
        ));
        Ok(value)
    }
}

fn event_type_for(input_type: InputType) -> EventType {
    match input_type {
        InputType::Axis => EventType::Axis,
        InputType::Button => EventType::Button,
        InputType::Hat => EventType::Hat,
    }
}
