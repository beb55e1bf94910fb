//! Drives a single functor tree outside of the engine with explicit
//! timestamps.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::broadcast;

use crate::input::{
    action::{Action, ActionKind, RemapAction, RemapTarget},
    event::{value::InputValue, Event, EventType, InputKey},
    logical_device::{InputType, LogicalDevice},
    macros::MacroManager,
    output::{Outputs, BUFFER_SIZE},
    timer::{TimerQueue, TimerTarget},
};

use super::{Context, EngineRequest, Functor, FunctorBuilder, FunctorRegistry, Value};

pub const DEVICE: &str = "stick";

pub struct Harness {
    pub start: Instant,
    pub outputs: Outputs,
    pub timers: TimerQueue,
    pub macros: MacroManager,
    pub physical: HashMap<InputKey, InputValue>,
    pub requests: Vec<EngineRequest>,
    events: broadcast::Receiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        let (tx, events) = broadcast::channel(BUFFER_SIZE);
        Self {
            start: Instant::now(),
            outputs: Outputs::new(LogicalDevice::default(), tx),
            timers: TimerQueue::new(),
            macros: MacroManager::new(Duration::from_millis(50)),
            physical: HashMap::new(),
            requests: Vec::new(),
            events,
        }
    }

    pub fn at(&self, millis: u64) -> Instant {
        self.start + Duration::from_millis(millis)
    }

    /// Build a functor for an action receiving values of the given type
    pub fn build(action: Action, input_type: InputType) -> Box<dyn Functor> {
        let registry = FunctorRegistry::default();
        let mut builder = FunctorBuilder::new(&registry, Default::default());
        builder.build_root(&action, input_type).unwrap()
    }

    /// Fire all timers due at the given time, then deliver the event.
    /// Returns the value as left by the functor.
    pub fn send(&mut self, functor: &mut dyn Functor, millis: u64, event: Event) -> Value {
        self.run_timers(functor, millis);
        let now = self.at(millis);
        let mut value = Value::new(event.value);
        let mut ctx = Context::new(
            now,
            0,
            &mut self.outputs,
            &mut self.timers,
            &mut self.macros,
            &self.physical,
        );
        functor.process_event(&event, &mut value, &mut ctx).unwrap();
        self.requests.extend(ctx.requests);
        value
    }

    pub fn button(&mut self, functor: &mut dyn Functor, millis: u64, pressed: bool) {
        self.send(functor, millis, Event::button(DEVICE, 1, pressed));
    }

    /// Press and release the physical button
    pub fn tap(&mut self, functor: &mut dyn Functor, press: u64, release: u64) {
        self.button(functor, press, true);
        self.button(functor, release, false);
    }

    pub fn run_timers(&mut self, functor: &mut dyn Functor, millis: u64) {
        let now = self.at(millis);
        while let Some(due) = self.timers.pop_due(now) {
            match due.target {
                TimerTarget::Functor { node, .. } => {
                    let mut ctx = Context::new(
                        due.deadline,
                        0,
                        &mut self.outputs,
                        &mut self.timers,
                        &mut self.macros,
                        &self.physical,
                    );
                    let handled = functor.on_timer(node, due.id, &mut ctx).unwrap();
                    assert!(handled, "timer for node {node} was not handled");
                    self.requests.extend(ctx.requests);
                }
                TimerTarget::Macro(id) => {
                    self.macros
                        .advance(id, due.deadline, &mut self.timers, &mut self.outputs)
                        .unwrap();
                }
            }
        }
    }

    pub fn cancel(&mut self, functor: &mut dyn Functor, millis: u64) {
        let mut ctx = Context::new(
            self.at(millis),
            0,
            &mut self.outputs,
            &mut self.timers,
            &mut self.macros,
            &self.physical,
        );
        functor.cancel_timers(&mut ctx);
    }

    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Logical button transitions emitted since the last call, as
    /// `(button, pressed)`
    pub fn buttons(&mut self) -> Vec<(u32, bool)> {
        self.drain()
            .into_iter()
            .filter(|event| event.event_type == EventType::Button)
            .map(|event| (event.input_id, event.value.pressed()))
            .collect()
    }
}

/// Remap to the given logical button
pub fn remap_button(id: u32) -> Action {
    Action::new(ActionKind::Remap(RemapAction {
        target: RemapTarget::Button(id),
        invert: false,
    }))
}

/// Remap to the given logical axis
pub fn remap_axis(id: u32) -> Action {
    Action::new(ActionKind::Remap(RemapAction {
        target: RemapTarget::Axis(id),
        invert: false,
    }))
}
