//! Async service owning an [Engine]. A single dispatch task processes
//! commands in order and fires timers when the earliest deadline passes.
pub mod client;
pub mod command;


use std::time::Instant;

use tokio::{
    sync::{broadcast, mpsc},
    time,
};

use crate::config::{ConfigError, Profile};

use self::{client::RuntimeClient, command::RuntimeCommand};

use super::{dispatcher::Engine, event::Event, timer::seconds};

/// Size of the command channel
const BUFFER_SIZE: usize = 2048;

/// What woke up the dispatch task
enum Wakeup {
    Command(Option<RuntimeCommand>),
    Timer,
}

/// Current time as seen by the engine. Follows the tokio clock so paused
/// test time applies to the engine as well.
fn now() -> Instant {
    time::Instant::now().into_std()
}

/// Waits until the given deadline, or forever without one
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Runs a remapping [Engine] behind a command channel
#[derive(Debug)]
pub struct Runtime {
    engine: Engine,
    tx: mpsc::Sender<RuntimeCommand>,
    rx: mpsc::Receiver<RuntimeCommand>,
}

impl Runtime {
    /// Create a new runtime for the given profile
    pub fn new(profile: &Profile) -> Result<Self, ConfigError> {
        let engine = Engine::new(profile)?;
        let (tx, rx) = mpsc::channel(BUFFER_SIZE);
        Ok(Self { engine, tx, rx })
    }

    /// Return a client to communicate with the runtime while it is running
    pub fn client(&self) -> RuntimeClient {
        self.tx.clone().into()
    }

    /// Receiver for every event emitted by the engine
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.engine.subscribe()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Process commands and timers until a stop command is received
    pub async fn run(&mut self) {
        log::debug!("Starting runtime for profile '{}'", self.engine.profile().name);
        loop {
            let deadline = self.engine.next_deadline();
            let wakeup = tokio::select! {
                cmd = self.rx.recv() => Wakeup::Command(cmd),
                _ = sleep_until(deadline) => Wakeup::Timer,
            };

            match wakeup {
                Wakeup::Command(Some(RuntimeCommand::Stop)) | Wakeup::Command(None) => break,
                Wakeup::Command(Some(cmd)) => self.handle_command(cmd).await,
                Wakeup::Timer => {
                    if let Err(e) = self.engine.run_timers(now()) {
                        log::error!("Failed to run timers: {e}");
                    }
                }
            }
        }

        self.engine.stop(now());
        log::debug!("Runtime stopped");
    }

    async fn handle_command(&mut self, cmd: RuntimeCommand) {
        match cmd {
            RuntimeCommand::ProcessEvent(event) => {
                if let Err(e) = self.engine.process_event(event, now()) {
                    log::error!("Failed to process event: {e}");
                }
            }
            RuntimeCommand::GetCurrentMode(sender) => {
                let mode = self.engine.current_mode().to_string();
                if let Err(e) = sender.send(mode).await {
                    log::error!("Failed to send current mode: {e}");
                }
            }
            RuntimeCommand::GetModeNames(sender) => {
                if let Err(e) = sender.send(self.engine.mode_names()).await {
                    log::error!("Failed to send mode names: {e}");
                }
            }
            RuntimeCommand::GetProfileName(sender) => {
                let name = self.engine.profile().name.clone();
                if let Err(e) = sender.send(name).await {
                    log::error!("Failed to send profile name: {e}");
                }
            }
            RuntimeCommand::SwitchMode(mode, sender) => {
                let result = self
                    .engine
                    .switch_mode(&mode, now())
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send switch mode result: {e}");
                }
            }
            RuntimeCommand::CycleModes(modes, sender) => {
                let result = self
                    .engine
                    .cycle_modes(&modes, now())
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send cycle modes result: {e}");
                }
            }
            RuntimeCommand::SetFocusedProcess(process, sender) => {
                let result = self
                    .engine
                    .set_focused_process(&process, now())
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send focused process result: {e}");
                }
            }
            RuntimeCommand::LoadProfile(profile, sender) => {
                let result = self
                    .engine
                    .load_profile(&profile, now())
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send load profile result: {e}");
                }
            }
            RuntimeCommand::QueueMacro(macro_, sender) => {
                let result = self
                    .engine
                    .queue_macro(*macro_, now())
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send macro playback id: {e}");
                }
            }
            RuntimeCommand::TerminateMacro(id, sender) => {
                let terminated = self.engine.terminate_macro(id);
                if let Err(e) = sender.send(terminated).await {
                    log::error!("Failed to send terminate macro result: {e}");
                }
            }
            RuntimeCommand::GetDefaultDelay(sender) => {
                let delay = self.engine.default_delay().as_secs_f64();
                if let Err(e) = sender.send(delay).await {
                    log::error!("Failed to send default delay: {e}");
                }
            }
            RuntimeCommand::SetDefaultDelay(delay) => {
                self.engine.set_default_delay(seconds(delay));
            }
            RuntimeCommand::GetLogicalValue(input_type, input_id, sender) => {
                let result = self
                    .engine
                    .logical_device()
                    .get(input_type, input_id)
                    .map_err(|e| e.to_string());
                if let Err(e) = sender.send(result).await {
                    log::error!("Failed to send logical value: {e}");
                }
            }
            RuntimeCommand::ResetLogicalDevice => self.engine.reset_logical_device(),
            RuntimeCommand::SetPaused(paused) => self.engine.set_paused(paused),
            RuntimeCommand::Subscribe(sender) => {
                if let Err(e) = sender.send(self.engine.subscribe()).await {
                    log::error!("Failed to send event receiver: {e}");
                }
            }
            RuntimeCommand::Stop => (),
        }
    }
}
