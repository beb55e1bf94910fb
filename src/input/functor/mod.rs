//! Functors are the runtime companions of [Action] nodes. Every action in a
//! loaded profile is turned into one functor which owns all mutable state
//! the action needs (cursors, timers, latches).
pub mod axis;
pub mod chain;
pub mod condition;
pub mod double_tap;
pub mod macro_player;
pub mod mode_switch;
pub mod remap;
pub mod smart_toggle;
pub mod tempo;

#[cfg(test)]
pub mod axis_test;
#[cfg(test)]
pub mod harness;
#[cfg(test)]
pub mod remap_test;

use std::{
    collections::HashMap,
    fmt::Debug,
    time::{Duration, Instant},
};

use crate::config::ConfigError;

use super::{
    action::Action,
    dispatcher::RuntimeError,
    event::{value::InputValue, Event, InputKey},
    logical_device::{InputType, LogicalDeviceLayout},
    macros::MacroManager,
    output::Outputs,
    timer::{TimerId, TimerQueue, TimerTarget},
};

/// Index of a root functor in the engine
pub type FunctorId = usize;

/// Identifier of a single functor node. Unique within a loaded profile.
pub type NodeId = u64;

/// Tells the dispatcher whether later functors bound to the same input
/// should still run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Value passed along the functors of a binding. Shaping functors (e.g.
/// response curves) replace `current` for the functors that follow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    pub current: InputValue,
}

impl Value {
    pub fn new(current: InputValue) -> Self {
        Self { current }
    }
}

/// Engine state changes requested by functors. They are applied once the
/// current dispatch has completed.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    SwitchMode(String),
    PushTemporaryMode(String),
    PopTemporaryMode,
    CycleModes(Vec<String>),
    PreviousMode,
    Pause,
    Resume,
    TogglePause,
}

/// Everything a functor may touch while handling an event or a timer
pub struct Context<'a> {
    /// Time of the event, or the deadline of the expired timer
    pub now: Instant,
    /// Root functor currently being run
    pub root: FunctorId,
    pub outputs: &'a mut Outputs,
    pub timers: &'a mut TimerQueue,
    pub macros: &'a mut MacroManager,
    /// Last value reported by every physical input
    pub physical: &'a HashMap<InputKey, InputValue>,
    pub requests: Vec<EngineRequest>,
}

impl<'a> Context<'a> {
    pub fn new(
        now: Instant,
        root: FunctorId,
        outputs: &'a mut Outputs,
        timers: &'a mut TimerQueue,
        macros: &'a mut MacroManager,
        physical: &'a HashMap<InputKey, InputValue>,
    ) -> Self {
        Self {
            now,
            root,
            outputs,
            timers,
            macros,
            physical,
            requests: Vec::new(),
        }
    }

    /// Schedule a timer for the given node of the current root
    pub fn schedule(&mut self, node: NodeId, delay: Duration) -> TimerId {
        let target = TimerTarget::Functor {
            root: self.root,
            node,
        };
        self.timers.schedule(self.now + delay, target)
    }

    pub fn cancel(&mut self, timer: TimerId) {
        self.timers.cancel(timer);
    }

    pub fn request(&mut self, request: EngineRequest) {
        log::trace!("Functor requested {request:?}");
        self.requests.push(request);
    }
}

/// Runtime behavior of an action
pub trait Functor: Debug + Send {
    /// Node id used to route timers to this functor
    fn id(&self) -> NodeId;

    /// Handle an input event. `value` carries the (possibly shaped) value of
    /// the event.
    fn process_event(
        &mut self,
        event: &Event,
        value: &mut Value,
        ctx: &mut Context,
    ) -> Result<Flow, RuntimeError>;

    /// Handle an expired timer addressed to `node`. Returns true if the
    /// timer was addressed to this functor or one of its children.
    fn on_timer(
        &mut self,
        node: NodeId,
        timer: TimerId,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        let _ = (node, timer, ctx);
        Ok(false)
    }

    /// Drop any pending timers and return to the idle state
    fn cancel_timers(&mut self, ctx: &mut Context) {
        let _ = ctx;
    }

    /// Functors that keep running while the engine is paused
    fn is_pause_control(&self) -> bool {
        false
    }

    /// Inputs other than the bound input this functor wants to receive
    fn extra_inputs(&self) -> Vec<InputKey> {
        Vec::new()
    }
}

/// Send a synthesized button state to a child functor
pub fn send_button(
    child: &mut dyn Functor,
    event: &Event,
    pressed: bool,
    ctx: &mut Context,
) -> Result<Flow, RuntimeError> {
    let value = InputValue::Bool(pressed);
    let event = event.with_value(value);
    child.process_event(&event, &mut Value::new(value), ctx)
}

/// Deliver a timer to the first child that owns it
pub fn forward_timer(
    children: &mut [Box<dyn Functor>],
    node: NodeId,
    timer: TimerId,
    ctx: &mut Context,
) -> Result<bool, RuntimeError> {
    for child in children.iter_mut() {
        if child.on_timer(node, timer, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Cancel the timers of every child
pub fn cancel_children(children: &mut [Box<dyn Functor>], ctx: &mut Context) {
    for child in children.iter_mut() {
        child.cancel_timers(ctx);
    }
}

/// Extra inputs wanted by any of the children
pub fn children_extra_inputs<'a>(
    children: impl IntoIterator<Item = &'a Box<dyn Functor>>,
) -> Vec<InputKey> {
    let mut keys: Vec<InputKey> = Vec::new();
    for key in children.into_iter().flat_map(|child| child.extra_inputs()) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Builds a functor for an action
pub type Constructor = fn(&Action, &mut FunctorBuilder) -> Result<Box<dyn Functor>, ConfigError>;

/// Table of functor constructors keyed by action type tag
#[derive(Clone)]
pub struct FunctorRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Debug for FunctorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctorRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl FunctorRegistry {
    /// Returns a registry without any constructors
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register (or replace) the constructor for the given action type
    pub fn register(&mut self, tag: &'static str, constructor: Constructor) {
        self.constructors.insert(tag, constructor);
    }

    pub fn get(&self, tag: &str) -> Option<Constructor> {
        self.constructors.get(tag).copied()
    }

    /// Registered action types, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.constructors.keys().copied().collect();
        tags.sort();
        tags
    }
}

impl Default for FunctorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("remap", remap::build);
        registry.register("condition", condition::build);
        registry.register("chain", chain::build);
        registry.register("tempo", tempo::build);
        registry.register("double_tap", double_tap::build);
        registry.register("double_tap_tempo", double_tap::build_tempo);
        registry.register("macro", macro_player::build);
        registry.register("merge_axis", axis::build_merge);
        registry.register("split_axis", axis::build_split);
        registry.register("response_curve", axis::build_curve);
        registry.register("smart_toggle", smart_toggle::build);
        registry.register("pause_resume", mode_switch::build_pause);
        registry.register("switch_mode", mode_switch::build);
        registry.register("temporary_mode", mode_switch::build);
        registry.register("cycle_modes", mode_switch::build);
        registry.register("previous_mode", mode_switch::build);
        registry
    }
}

/// Turns actions into functors, assigning node ids and checking that each
/// action fits the input it is bound to.
#[derive(Debug)]
pub struct FunctorBuilder<'a> {
    registry: &'a FunctorRegistry,
    layout: LogicalDeviceLayout,
    input_type: InputType,
    next_node: NodeId,
}

impl<'a> FunctorBuilder<'a> {
    pub fn new(registry: &'a FunctorRegistry, layout: LogicalDeviceLayout) -> Self {
        Self {
            registry,
            layout,
            input_type: InputType::Button,
            next_node: 0,
        }
    }

    /// Build the functor tree for an action bound to an input delivering
    /// values of the given type
    pub fn build_root(
        &mut self,
        action: &Action,
        input_type: InputType,
    ) -> Result<Box<dyn Functor>, ConfigError> {
        self.input_type = input_type;
        self.build(action)
    }

    /// Build the functor for a (child) action
    pub fn build(&mut self, action: &Action) -> Result<Box<dyn Functor>, ConfigError> {
        let tag = action.kind.tag();
        let Some(constructor) = self.registry.get(tag) else {
            return Err(ConfigError::UnknownActionTag(tag.to_string()));
        };
        constructor(action, self)
    }

    pub fn build_all(&mut self, actions: &[Action]) -> Result<Vec<Box<dyn Functor>>, ConfigError> {
        actions.iter().map(|action| self.build(action)).collect()
    }

    /// Allocate a new node id
    pub fn next_id(&mut self) -> NodeId {
        self.next_node += 1;
        self.next_node
    }

    /// Kind of value the action being built receives
    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    /// Fail unless the action receives button values
    pub fn require_button(&self, action: &Action) -> Result<(), ConfigError> {
        if self.input_type != InputType::Button {
            return Err(ConfigError::RequiresButton(action.id, action.kind.tag()));
        }
        Ok(())
    }

    /// Fail unless the logical device declares the given input
    pub fn require_logical(
        &self,
        action: &Action,
        input_type: InputType,
        input_id: u32,
    ) -> Result<(), ConfigError> {
        let count = match input_type {
            InputType::Axis => self.layout.axes,
            InputType::Button => self.layout.buttons,
            InputType::Hat => self.layout.hats,
        };
        if input_id == 0 || input_id > count {
            return Err(ConfigError::UnknownLogicalInput(
                action.id, input_type, input_id,
            ));
        }
        Ok(())
    }
}
