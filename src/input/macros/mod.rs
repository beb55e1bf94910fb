//! Macro playback. Playbacks advance through their action list on the
//! engine's timer queue, so any number of them run concurrently and a pause
//! in one never blocks the others.

use std::{collections::BTreeMap, sync::Arc, time::Duration, time::Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    event::{value::InputValue, Event},
    logical_device::{InputType, LogicalDeviceError},
    output::Outputs,
    timer::{seconds, TimerId, TimerQueue, TimerTarget},
};

/// Identifier of a running macro playback
pub type PlaybackId = u64;

/// Repeating playbacks always wait at least this long between iterations
const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// A single step of a macro
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MacroAction {
    /// Write a logical device input. Axis values marked `relative` are added
    /// to the current axis value.
    Joystick {
        input_type: InputType,
        input_id: u32,
        value: InputValue,
        #[serde(default)]
        relative: bool,
    },
    Key {
        scan_code: u32,
        #[serde(default)]
        extended: bool,
        pressed: bool,
    },
    MouseButton { button: u32, pressed: bool },
    MouseMotion {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    /// Wait for the given number of seconds
    Pause { duration: f64 },
}

/// How often a macro plays. Delays are in seconds and fall back to the
/// manager's default delay when omitted.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// Play once
    #[default]
    Single,
    /// Play `count` times in total
    Count { count: u32, delay: Option<f64> },
    /// Play until the triggering input is released
    Hold { delay: Option<f64> },
    /// Start on one press and stop on the next
    Toggle { delay: Option<f64> },
}

impl RepeatPolicy {
    /// Delay before the next iteration after `completed` iterations, or None
    /// if the playback is done
    fn next_delay(&self, completed: u32, default_delay: Duration) -> Option<Duration> {
        let delay = match self {
            RepeatPolicy::Single => return None,
            RepeatPolicy::Count { count, delay } => {
                if completed >= *count {
                    return None;
                }
                delay
            }
            RepeatPolicy::Hold { delay } | RepeatPolicy::Toggle { delay } => delay,
        };
        let delay = delay.map(seconds).unwrap_or(default_delay);
        Some(delay.max(MIN_REPEAT_INTERVAL))
    }
}

/// An ordered list of actions together with its repeat behavior
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Macro {
    pub actions: Vec<MacroAction>,
    #[serde(default)]
    pub repeat: RepeatPolicy,
    /// Starting an exclusive macro terminates every other running exclusive
    /// macro
    #[serde(default)]
    pub exclusive: bool,
}

/// State of one running macro
#[derive(Debug)]
struct Playback {
    macro_: Arc<Macro>,
    cursor: usize,
    iteration: u32,
    timer: Option<TimerId>,
}

/// Result of running a playback as far as it can go
enum Step {
    Wait(Duration),
    Finished,
}

/// Schedules and executes macro playbacks
#[derive(Debug)]
pub struct MacroManager {
    playbacks: BTreeMap<PlaybackId, Playback>,
    next_id: PlaybackId,
    default_delay: Duration,
}

impl MacroManager {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            playbacks: BTreeMap::new(),
            next_id: 0,
            default_delay,
        }
    }

    /// Delay inserted between consecutive non-pause actions
    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    pub fn set_default_delay(&mut self, delay: Duration) {
        log::debug!("Setting default macro delay to {delay:?}");
        self.default_delay = delay;
    }

    /// Returns true if the given playback has not finished yet
    pub fn is_running(&self, id: PlaybackId) -> bool {
        self.playbacks.contains_key(&id)
    }

    /// Ids of all running playbacks, oldest first
    pub fn running(&self) -> Vec<PlaybackId> {
        self.playbacks.keys().copied().collect()
    }

    /// Start playing the given macro. Actions up to the first delay run
    /// immediately.
    pub fn queue_macro(
        &mut self,
        macro_: Arc<Macro>,
        now: Instant,
        timers: &mut TimerQueue,
        outputs: &mut Outputs,
    ) -> Result<PlaybackId, LogicalDeviceError> {
        if macro_.exclusive {
            let exclusive: Vec<PlaybackId> = self
                .playbacks
                .iter()
                .filter(|(_, playback)| playback.macro_.exclusive)
                .map(|(id, _)| *id)
                .collect();
            for id in exclusive {
                log::debug!("Exclusive macro started, terminating playback {id}");
                self.terminate_macro(id, timers);
            }
        }

        self.next_id += 1;
        let id = self.next_id;
        log::debug!("Queueing macro playback {id}");
        self.playbacks.insert(
            id,
            Playback {
                macro_,
                cursor: 0,
                iteration: 0,
                timer: None,
            },
        );
        self.advance(id, now, timers, outputs)?;
        Ok(id)
    }

    /// Stop the given playback. Returns false if it was not running.
    pub fn terminate_macro(&mut self, id: PlaybackId, timers: &mut TimerQueue) -> bool {
        let Some(playback) = self.playbacks.remove(&id) else {
            log::trace!("Macro playback {id} is not running");
            return false;
        };
        if let Some(timer) = playback.timer {
            timers.cancel(timer);
        }
        log::debug!("Terminated macro playback {id}");
        true
    }

    /// Stop every running playback
    pub fn terminate_all(&mut self, timers: &mut TimerQueue) {
        for id in self.running() {
            self.terminate_macro(id, timers);
        }
    }

    /// Continue the given playback. Called when its timer expires, with `now`
    /// being the timer deadline.
    pub fn advance(
        &mut self,
        id: PlaybackId,
        now: Instant,
        timers: &mut TimerQueue,
        outputs: &mut Outputs,
    ) -> Result<(), LogicalDeviceError> {
        let default_delay = self.default_delay;
        let Some(playback) = self.playbacks.get_mut(&id) else {
            log::trace!("Ignoring timer for finished macro playback {id}");
            return Ok(());
        };
        playback.timer = None;

        match Self::run(playback, default_delay, outputs) {
            Ok(Step::Wait(delay)) => {
                playback.timer = Some(timers.schedule(now + delay, TimerTarget::Macro(id)));
                Ok(())
            }
            Ok(Step::Finished) => {
                log::debug!("Macro playback {id} finished");
                self.playbacks.remove(&id);
                Ok(())
            }
            Err(e) => {
                log::error!("Macro playback {id} failed: {e}");
                self.playbacks.remove(&id);
                Err(e)
            }
        }
    }

    /// Execute actions until the playback has to wait or is done
    fn run(
        playback: &mut Playback,
        default_delay: Duration,
        outputs: &mut Outputs,
    ) -> Result<Step, LogicalDeviceError> {
        let macro_ = playback.macro_.clone();
        let actions = &macro_.actions;
        loop {
            if playback.cursor >= actions.len() {
                playback.iteration += 1;
                let Some(delay) = macro_.repeat.next_delay(playback.iteration, default_delay)
                else {
                    return Ok(Step::Finished);
                };
                playback.cursor = 0;
                return Ok(Step::Wait(delay));
            }

            let action = &actions[playback.cursor];
            playback.cursor += 1;
            if let MacroAction::Pause { duration } = action {
                return Ok(Step::Wait(seconds(*duration)));
            }
            execute(action, outputs)?;

            let next_is_pause = matches!(
                actions.get(playback.cursor),
                Some(MacroAction::Pause { .. })
            );
            if playback.cursor < actions.len() && !next_is_pause && !default_delay.is_zero() {
                return Ok(Step::Wait(default_delay));
            }
        }
    }
}

/// Perform a single non-pause macro action
fn execute(action: &MacroAction, outputs: &mut Outputs) -> Result<(), LogicalDeviceError> {
    match action {
        MacroAction::Joystick {
            input_type,
            input_id,
            value,
            relative,
        } => {
            if *relative && *input_type == InputType::Axis {
                let delta = value
                    .as_float()
                    .ok_or(LogicalDeviceError::InvalidValue(*input_type, *value))?;
                outputs.nudge_axis(*input_id, delta)?;
            } else {
                outputs.set_logical(*input_type, *input_id, *value)?;
            }
        }
        MacroAction::Key {
            scan_code,
            extended,
            pressed,
        } => outputs.emit(Event::key(*scan_code, *extended, *pressed)),
        MacroAction::MouseButton { button, pressed } => {
            outputs.emit(Event::mouse_button(*button, *pressed))
        }
        MacroAction::MouseMotion { dx, dy } => {
            if *dx != 0.0 {
                outputs.emit(Event::mouse_motion(0, *dx));
            }
            if *dy != 0.0 {
                outputs.emit(Event::mouse_motion(1, *dy));
            }
        }
        MacroAction::Pause { .. } => (),
    }
    Ok(())
}
