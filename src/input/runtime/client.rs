use std::time::Duration;

use thiserror::Error;
use tokio::sync::{
    broadcast,
    mpsc::{channel, error::SendError, error::SendTimeoutError, Receiver, Sender},
};

use crate::{
    config::Profile,
    input::{
        event::Event,
        logical_device::{Cell, InputType},
        macros::{Macro, PlaybackId},
    },
    sync::{ReceiveTimeoutError, TimeoutReceiver},
};

use super::command::RuntimeCommand;

/// Maximum duration to wait for a response from a command. If this timeout
/// is reached, that typically indicates a deadlock somewhere in the code.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Possible errors for a runtime client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to send command to runtime: {0}")]
    SendError(SendError<RuntimeCommand>),
    #[error("service encountered an error processing the request: {0}")]
    ServiceError(Box<dyn std::error::Error + Send + Sync>),
    #[error("runtime no longer exists")]
    ChannelClosed,
}

impl From<SendError<RuntimeCommand>> for ClientError {
    fn from(err: SendError<RuntimeCommand>) -> Self {
        Self::SendError(err)
    }
}

/// A client for a running [super::Runtime]
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    tx: Sender<RuntimeCommand>,
}

impl From<Sender<RuntimeCommand>> for RuntimeClient {
    fn from(tx: Sender<RuntimeCommand>) -> Self {
        RuntimeClient::new(tx)
    }
}

impl RuntimeClient {
    pub fn new(tx: Sender<RuntimeCommand>) -> Self {
        Self { tx }
    }

    /// Send the given command to the runtime. This method uses a timeout to
    /// detect potential deadlocks.
    async fn send(&self, cmd: RuntimeCommand) -> Result<(), ClientError> {
        let result = self.tx.send_timeout(cmd, DEFAULT_TIMEOUT).await;
        let Err(err) = result else {
            return Ok(());
        };
        match err {
            SendTimeoutError::Timeout(ref cmd) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} sending command to runtime: {cmd:?}");
                Err(ClientError::ServiceError(err.into()))
            }
            SendTimeoutError::Closed(_) => Err(ClientError::ChannelClosed),
        }
    }

    /// Use the given receiver to wait for a response from the runtime.
    /// This method uses a timeout to detect potential deadlocks.
    async fn recv<T>(mut rx: Receiver<T>) -> Result<T, ClientError>
    where
        T: Send + Sync,
    {
        match rx.recv_timeout(DEFAULT_TIMEOUT).await {
            Ok(value) => Ok(value),
            Err(ReceiveTimeoutError::Timeout) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} waiting for response from runtime");
                Err(ClientError::ChannelClosed)
            }
            Err(ReceiveTimeoutError::Closed) => Err(ClientError::ChannelClosed),
        }
    }

    /// Wait for a response that carries a service side error message
    async fn recv_result<T>(rx: Receiver<Result<T, String>>) -> Result<T, ClientError>
    where
        T: Send + Sync,
    {
        Self::recv(rx)
            .await?
            .map_err(|e| ClientError::ServiceError(e.into()))
    }

    /// Process the given input event
    pub async fn process_event(&self, event: Event) -> Result<(), ClientError> {
        self.send(RuntimeCommand::ProcessEvent(event)).await
    }

    /// Process the given input event (blocking)
    pub fn blocking_process_event(&self, event: Event) -> Result<(), ClientError> {
        self.tx.blocking_send(RuntimeCommand::ProcessEvent(event))?;
        Ok(())
    }

    /// Get the name of the active mode
    pub async fn current_mode(&self) -> Result<String, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::GetCurrentMode(tx)).await?;
        Self::recv(rx).await
    }

    /// Get the names of all modes in declaration order
    pub async fn mode_names(&self) -> Result<Vec<String>, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::GetModeNames(tx)).await?;
        Self::recv(rx).await
    }

    /// Get the name of the loaded profile
    pub async fn profile_name(&self) -> Result<String, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::GetProfileName(tx)).await?;
        Self::recv(rx).await
    }

    pub async fn switch_mode(&self, mode: &str) -> Result<(), ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::SwitchMode(mode.to_string(), tx))
            .await?;
        Self::recv_result(rx).await
    }

    /// Switch to the mode following the active one in the given list
    pub async fn cycle_modes(&self, modes: Vec<String>) -> Result<(), ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::CycleModes(modes, tx)).await?;
        Self::recv_result(rx).await
    }

    /// Apply the profile's auto switch rules for the given process. Returns
    /// the selected mode.
    pub async fn set_focused_process(&self, process: &str) -> Result<Option<String>, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::SetFocusedProcess(process.to_string(), tx))
            .await?;
        Self::recv_result(rx).await
    }

    /// Replace the running profile
    pub async fn load_profile(&self, profile: Profile) -> Result<(), ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::LoadProfile(Box::new(profile), tx))
            .await?;
        Self::recv_result(rx).await
    }

    /// Start playing the given macro
    pub async fn queue_macro(&self, macro_: Macro) -> Result<PlaybackId, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::QueueMacro(Box::new(macro_), tx))
            .await?;
        Self::recv_result(rx).await
    }

    /// Stop the given macro playback. Returns false if it was not running.
    pub async fn terminate_macro(&self, id: PlaybackId) -> Result<bool, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::TerminateMacro(id, tx)).await?;
        Self::recv(rx).await
    }

    /// Seconds between consecutive macro actions
    pub async fn default_delay(&self) -> Result<f64, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::GetDefaultDelay(tx)).await?;
        Self::recv(rx).await
    }

    pub async fn set_default_delay(&self, delay: f64) -> Result<(), ClientError> {
        self.send(RuntimeCommand::SetDefaultDelay(delay)).await
    }

    /// Read a single logical device input
    pub async fn logical_value(
        &self,
        input_type: InputType,
        input_id: u32,
    ) -> Result<Cell, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::GetLogicalValue(input_type, input_id, tx))
            .await?;
        Self::recv_result(rx).await
    }

    pub async fn reset_logical_device(&self) -> Result<(), ClientError> {
        self.send(RuntimeCommand::ResetLogicalDevice).await
    }

    pub async fn set_paused(&self, paused: bool) -> Result<(), ClientError> {
        self.send(RuntimeCommand::SetPaused(paused)).await
    }

    /// Subscribe to the events emitted by the runtime
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<Event>, ClientError> {
        let (tx, rx) = channel(1);
        self.send(RuntimeCommand::Subscribe(tx)).await?;
        Self::recv(rx).await
    }

    /// Stop the runtime
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send(RuntimeCommand::Stop).await
    }
}
