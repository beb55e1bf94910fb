//! The [Engine] routes input events through the functors bound in the
//! current mode. It is fully synchronous and driven with explicit
//! timestamps; the async [crate::input::runtime::Runtime] owns one and feeds
//! it events and timer wakeups.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{ConfigError, Profile};

use super::{
    action::Behavior,
    event::{value::InputValue, Event, InputKey},
    functor::{
        Context, EngineRequest, Flow, Functor, FunctorBuilder, FunctorId, FunctorRegistry, Value,
    },
    logical_device::{LogicalDevice, LogicalDeviceError},
    macros::{Macro, MacroManager, PlaybackId},
    mode::{Mode, ModeChange, ModeError, ModeManager},
    output::{Outputs, BUFFER_SIZE},
    timer::{seconds, TimerQueue, TimerTarget},
};

/// Possible errors while processing input
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Logical device error: {0}")]
    LogicalDevice(#[from] LogicalDeviceError),
    #[error("Mode error: {0}")]
    Mode(#[from] ModeError),
    #[error("Invalid profile: {0}")]
    Config(#[from] ConfigError),
    #[error("No root functor with id {0}")]
    MissingFunctor(FunctorId),
}

/// A root functor together with the binding it was created for
#[derive(Debug)]
struct RootSlot {
    functor: Box<dyn Functor>,
    mode: String,
    behavior: Behavior,
    /// The functor received a press that was not released yet
    pressed: bool,
}

/// Functors and modes built from a profile
struct Graph {
    roots: Vec<RootSlot>,
    modes: ModeManager,
}

impl Graph {
    fn build(profile: &Profile, registry: &FunctorRegistry) -> Result<Graph, ConfigError> {
        profile.validate()?;
        let mut builder = FunctorBuilder::new(registry, profile.settings.logical_device);
        let mut roots = Vec::new();
        let mut modes = Vec::new();

        for config in profile.modes.iter() {
            let mut mode = Mode::new(config.name.as_str(), config.parent.clone());
            for binding in config.bindings.iter() {
                let input_type = binding.behavior.input_type(&binding.input);
                for action in binding.actions.iter() {
                    let functor = builder.build_root(action, input_type)?;
                    let id = roots.len();
                    let mut keys = vec![binding.input.clone()];
                    for key in functor.extra_inputs() {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                    for key in keys {
                        mode.bind(key, id);
                    }
                    roots.push(RootSlot {
                        functor,
                        mode: config.name.clone(),
                        behavior: binding.behavior.clone(),
                        pressed: false,
                    });
                }
            }
            modes.push(mode);
        }

        let start = profile.start_mode().ok_or(ConfigError::NoModes)?;
        let modes = ModeManager::new(modes, start).map_err(|e| match e {
            ModeError::UnknownMode(name) => ConfigError::UnknownMode(name),
        })?;
        log::debug!(
            "Built {} root functors across {} modes",
            roots.len(),
            profile.modes.len()
        );

        Ok(Graph { roots, modes })
    }
}

/// Presents an event the way functors bound with the given behavior see it
fn present(behavior: &Behavior, event: &Event) -> Event {
    match behavior {
        Behavior::Native => event.clone(),
        Behavior::AxisButton { low, high } => {
            let pressed = event
                .value
                .as_float()
                .map(|v| *low <= v && v <= *high)
                .unwrap_or(false);
            event.with_value(InputValue::Bool(pressed))
        }
        Behavior::HatButton { directions } => {
            let pressed = event
                .value
                .as_hat()
                .map(|direction| directions.contains(&direction))
                .unwrap_or(false);
            event.with_value(InputValue::Bool(pressed))
        }
    }
}

/// Event dispatcher owning the functor graph, the mode state, the logical
/// device, the macro manager and the timer queue of a loaded profile.
#[derive(Debug)]
pub struct Engine {
    profile: Profile,
    registry: FunctorRegistry,
    roots: Vec<RootSlot>,
    modes: ModeManager,
    outputs: Outputs,
    timers: TimerQueue,
    macros: MacroManager,
    /// Last value reported by every physical input
    physical: HashMap<InputKey, InputValue>,
    /// Roots holding an unreleased press, per input
    latches: HashMap<InputKey, Vec<FunctorId>>,
    paused: bool,
}

impl Engine {
    /// Create a new engine for the given profile using the built-in functors
    pub fn new(profile: &Profile) -> Result<Engine, ConfigError> {
        Self::with_registry(profile, FunctorRegistry::default())
    }

    /// Create a new engine using a custom functor registry
    pub fn with_registry(profile: &Profile, registry: FunctorRegistry) -> Result<Engine, ConfigError> {
        let graph = Graph::build(profile, &registry)?;
        let (tx, _) = broadcast::channel(BUFFER_SIZE);
        let mut outputs = Outputs::new(LogicalDevice::new(profile.settings.logical_device), tx);
        outputs.set_mode(graph.modes.current());
        log::info!(
            "Loaded profile '{}' starting in mode '{}'",
            profile.name,
            graph.modes.current()
        );

        Ok(Engine {
            profile: profile.clone(),
            registry,
            roots: graph.roots,
            modes: graph.modes,
            outputs,
            timers: TimerQueue::new(),
            macros: MacroManager::new(seconds(profile.settings.default_delay)),
            physical: HashMap::new(),
            latches: HashMap::new(),
            paused: false,
        })
    }

    /// Replace the loaded profile. The new profile is fully built before the
    /// current one is stopped, so a broken profile leaves the engine as is.
    pub fn load_profile(&mut self, profile: &Profile, now: Instant) -> Result<(), ConfigError> {
        let graph = Graph::build(profile, &self.registry)?;
        self.stop(now);

        self.roots = graph.roots;
        self.modes = graph.modes;
        self.profile = profile.clone();
        self.physical.clear();
        self.latches.clear();
        self.paused = false;
        *self.outputs.device_mut() = LogicalDevice::new(profile.settings.logical_device);
        self.outputs.set_mode(self.modes.current());
        self.macros
            .set_default_delay(seconds(profile.settings.default_delay));
        log::info!(
            "Loaded profile '{}' starting in mode '{}'",
            profile.name,
            self.modes.current()
        );
        Ok(())
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns a receiver for every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.outputs.sender().subscribe()
    }

    /// Sender side of the emitted event stream
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.outputs.sender()
    }

    /// Process a single input event received at `now`. Timers due at or
    /// before `now` fire first.
    pub fn process_event(&mut self, event: Event, now: Instant) -> Result<(), RuntimeError> {
        self.run_timers(now)?;

        let event = event.with_mode(self.modes.current());
        let key = event.input_key();
        log::trace!("Processing event: {event:?}");
        self.physical.insert(key.clone(), event.value);

        let resolved: Vec<FunctorId> = self
            .modes
            .resolve(&key)
            .map(|(_, ids)| ids.to_vec())
            .unwrap_or_default();
        let latched: Vec<FunctorId> = self
            .latches
            .get(&key)
            .map(|ids| {
                ids.iter()
                    .filter(|id| !resolved.contains(id))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if resolved.is_empty() && latched.is_empty() {
            log::trace!("No bindings for {key}");
            return Ok(());
        }

        let mut requests = Vec::new();
        // Functors that are no longer bound still get the release of a press
        // they received
        for id in latched {
            let mut value = Value::new(event.value);
            self.dispatch(id, &key, &event, &mut value, true, now, &mut requests)?;
        }

        let mut value = Value::new(event.value);
        for id in resolved {
            let flow = self.dispatch(id, &key, &event, &mut value, false, now, &mut requests)?;
            if flow == Flow::Stop {
                log::trace!("Root functor {id} stopped dispatch of {key}");
                break;
            }
        }

        self.apply_requests(requests, now)
    }

    /// Run a single root functor
    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        id: FunctorId,
        key: &InputKey,
        event: &Event,
        value: &mut Value,
        release_only: bool,
        now: Instant,
        requests: &mut Vec<EngineRequest>,
    ) -> Result<Flow, RuntimeError> {
        let Some(slot) = self.roots.get_mut(id) else {
            return Err(RuntimeError::MissingFunctor(id));
        };
        let release_only = release_only || (self.paused && !slot.functor.is_pause_control());

        let presented = present(&slot.behavior, event);
        let mut virtual_value = Value::new(presented.value);
        let value = match slot.behavior {
            Behavior::Native => value,
            _ => &mut virtual_value,
        };

        if let Some(pressed) = presented.value.as_bool() {
            if pressed == slot.pressed {
                log::trace!("Root functor {id} ignoring repeated state {pressed}");
                return Ok(Flow::Continue);
            }
            if release_only && pressed {
                return Ok(Flow::Continue);
            }
            slot.pressed = pressed;
            let latches = self.latches.entry(key.clone()).or_default();
            if pressed {
                latches.push(id);
            } else {
                latches.retain(|latched| *latched != id);
            }
        } else if release_only {
            return Ok(Flow::Continue);
        }

        let mut ctx = Context::new(
            now,
            id,
            &mut self.outputs,
            &mut self.timers,
            &mut self.macros,
            &self.physical,
        );
        let flow = slot.functor.process_event(&presented, value, &mut ctx)?;
        requests.append(&mut ctx.requests);
        Ok(flow)
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at or before `now`, in deadline order
    pub fn run_timers(&mut self, now: Instant) -> Result<(), RuntimeError> {
        while let Some(due) = self.timers.pop_due(now) {
            match due.target {
                TimerTarget::Functor { root, node } => {
                    let Some(slot) = self.roots.get_mut(root) else {
                        return Err(RuntimeError::MissingFunctor(root));
                    };
                    let mut ctx = Context::new(
                        due.deadline,
                        root,
                        &mut self.outputs,
                        &mut self.timers,
                        &mut self.macros,
                        &self.physical,
                    );
                    if !slot.functor.on_timer(node, due.id, &mut ctx)? {
                        log::warn!("Timer {} for node {node} had no owner", due.id);
                    }
                    let requests = ctx.requests;
                    self.apply_requests(requests, due.deadline)?;
                }
                TimerTarget::Macro(id) => {
                    self.macros
                        .advance(id, due.deadline, &mut self.timers, &mut self.outputs)?;
                }
            }
        }
        Ok(())
    }

    fn apply_requests(
        &mut self,
        requests: Vec<EngineRequest>,
        now: Instant,
    ) -> Result<(), RuntimeError> {
        for request in requests {
            let change = match request {
                EngineRequest::SwitchMode(name) => self.modes.switch_to(&name)?,
                EngineRequest::PushTemporaryMode(name) => self.modes.push_temporary(&name)?,
                EngineRequest::PopTemporaryMode => self.modes.pop_temporary(),
                EngineRequest::CycleModes(names) => self.modes.cycle(&names)?,
                EngineRequest::PreviousMode => self.modes.switch_to_previous()?,
                EngineRequest::Pause => {
                    self.set_paused(true);
                    None
                }
                EngineRequest::Resume => {
                    self.set_paused(false);
                    None
                }
                EngineRequest::TogglePause => {
                    self.set_paused(!self.paused);
                    None
                }
            };
            if let Some(change) = change {
                self.on_mode_change(change, now);
            }
        }
        Ok(())
    }

    /// Cancel the timers of every functor in a mode that went inactive
    fn on_mode_change(&mut self, change: ModeChange, now: Instant) {
        log::info!("Mode changed from '{}' to '{}'", change.from, change.to);
        self.outputs.set_mode(change.to.as_str());
        if change.deactivated.is_empty() {
            return;
        }
        for (id, slot) in self.roots.iter_mut().enumerate() {
            if !change.deactivated.contains(&slot.mode) {
                continue;
            }
            let mut ctx = Context::new(
                now,
                id,
                &mut self.outputs,
                &mut self.timers,
                &mut self.macros,
                &self.physical,
            );
            slot.functor.cancel_timers(&mut ctx);
        }
    }

    pub fn current_mode(&self) -> &str {
        self.modes.current()
    }

    pub fn previous_mode(&self) -> &str {
        self.modes.previous()
    }

    pub fn mode_names(&self) -> Vec<String> {
        self.modes.mode_names()
    }

    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    pub fn switch_mode(&mut self, name: &str, now: Instant) -> Result<(), RuntimeError> {
        self.apply_requests(vec![EngineRequest::SwitchMode(name.to_string())], now)
    }

    pub fn switch_to_previous_mode(&mut self, now: Instant) -> Result<(), RuntimeError> {
        self.apply_requests(vec![EngineRequest::PreviousMode], now)
    }

    pub fn push_temporary_mode(&mut self, name: &str, now: Instant) -> Result<(), RuntimeError> {
        self.apply_requests(vec![EngineRequest::PushTemporaryMode(name.to_string())], now)
    }

    pub fn pop_temporary_mode(&mut self, now: Instant) -> Result<(), RuntimeError> {
        self.apply_requests(vec![EngineRequest::PopTemporaryMode], now)
    }

    pub fn cycle_modes(&mut self, names: &[String], now: Instant) -> Result<(), RuntimeError> {
        self.apply_requests(vec![EngineRequest::CycleModes(names.to_vec())], now)
    }

    /// Switch modes according to the profile's auto switch rules. Returns
    /// the mode that was selected, if any rule matched.
    pub fn set_focused_process(
        &mut self,
        process: &str,
        now: Instant,
    ) -> Result<Option<String>, RuntimeError> {
        let Some(mode) = self.profile.auto_switch_mode(process).map(str::to_string) else {
            log::trace!("No auto switch rule matches '{process}'");
            return Ok(None);
        };
        log::debug!("Focused process '{process}' selects mode '{mode}'");
        self.switch_mode(&mode, now)?;
        Ok(Some(mode))
    }

    pub fn logical_device(&self) -> &LogicalDevice {
        self.outputs.device()
    }

    pub fn logical_device_mut(&mut self) -> &mut LogicalDevice {
        self.outputs.device_mut()
    }

    pub fn reset_logical_device(&mut self) {
        self.outputs.device_mut().reset();
    }

    /// Start playing a macro outside of any binding
    pub fn queue_macro(&mut self, macro_: Macro, now: Instant) -> Result<PlaybackId, RuntimeError> {
        let id = self.macros.queue_macro(
            std::sync::Arc::new(macro_),
            now,
            &mut self.timers,
            &mut self.outputs,
        )?;
        Ok(id)
    }

    pub fn terminate_macro(&mut self, id: PlaybackId) -> bool {
        self.macros.terminate_macro(id, &mut self.timers)
    }

    pub fn macros(&self) -> &MacroManager {
        &self.macros
    }

    pub fn default_delay(&self) -> Duration {
        self.macros.default_delay()
    }

    pub fn set_default_delay(&mut self, delay: Duration) {
        self.macros.set_default_delay(delay);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// While paused only pause/resume functors receive input
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        log::info!("Input processing {}", if paused { "paused" } else { "resumed" });
        self.paused = paused;
    }

    /// Cancel every pending timer and running macro
    pub fn stop(&mut self, now: Instant) {
        log::debug!("Stopping engine for profile '{}'", self.profile.name);
        for (id, slot) in self.roots.iter_mut().enumerate() {
            let mut ctx = Context::new(
                now,
                id,
                &mut self.outputs,
                &mut self.timers,
                &mut self.macros,
                &self.physical,
            );
            slot.functor.cancel_timers(&mut ctx);
        }
        self.macros.terminate_all(&mut self.timers);
        self.timers.clear();
    }
}
