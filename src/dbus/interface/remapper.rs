use zbus::{fdo, object_server::SignalEmitter};
use zbus_macros::interface;

use crate::{config::Profile, input::runtime::client::RuntimeClient};

/// The [RemapperInterface] provides a DBus interface that can be exposed for
/// controlling a running [crate::input::runtime::Runtime]. It works by
/// sending commands through a [RuntimeClient].
pub struct RemapperInterface {
    runtime: RuntimeClient,
    profile_path: Option<String>,
}

impl RemapperInterface {
    pub fn new(runtime: RuntimeClient, profile_path: Option<String>) -> RemapperInterface {
        RemapperInterface {
            runtime,
            profile_path,
        }
    }
}

#[interface(
    name = "org.joyweave.Remapper",
    proxy(
        default_service = "org.joyweave.Remapper",
        default_path = "/org/joyweave/Remapper"
    )
)]
impl RemapperInterface {
    #[zbus(property)]
    async fn version(&self) -> fdo::Result<String> {
        const VERSION: &str = env!("CARGO_PKG_VERSION");
        Ok(VERSION.to_string())
    }

    /// Name of the active mode
    #[zbus(property)]
    async fn current_mode(&self) -> fdo::Result<String> {
        self.runtime
            .current_mode()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Names of all modes of the loaded profile
    #[zbus(property)]
    async fn modes(&self) -> fdo::Result<Vec<String>> {
        self.runtime
            .mode_names()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Name of the currently loaded profile
    #[zbus(property)]
    async fn profile_name(&self) -> fdo::Result<String> {
        self.runtime
            .profile_name()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Optional path to the currently loaded profile
    #[zbus(property)]
    async fn profile_path(&self) -> fdo::Result<String> {
        Ok(self.profile_path.clone().unwrap_or_default())
    }

    /// Seconds between consecutive macro actions
    #[zbus(property)]
    async fn default_delay(&self) -> fdo::Result<f64> {
        self.runtime
            .default_delay()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    #[zbus(property)]
    async fn set_default_delay(&self, delay: f64) -> zbus::Result<()> {
        self.runtime
            .set_default_delay(delay)
            .await
            .map_err(|e| zbus::Error::Failure(e.to_string()))
    }

    /// Make the given mode the active mode
    async fn switch_mode(
        &self,
        mode: String,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<()> {
        self.runtime
            .switch_mode(&mode)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        self.current_mode_changed(&emitter).await?;
        Ok(())
    }

    /// Switch to the mode following the active one in the given list
    async fn cycle_modes(
        &self,
        modes: Vec<String>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<()> {
        self.runtime
            .cycle_modes(modes)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        self.current_mode_changed(&emitter).await?;
        Ok(())
    }

    /// Notify the remapper about the process owning the focused window.
    /// Returns the mode selected by the profile's auto switch rules, or an
    /// empty string if no rule matched.
    async fn set_focused_process(
        &self,
        process: String,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<String> {
        let mode = self
            .runtime
            .set_focused_process(&process)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        if mode.is_some() {
            self.current_mode_changed(&emitter).await?;
        }
        Ok(mode.unwrap_or_default())
    }

    /// Load the profile from the given path
    async fn load_profile_path(
        &mut self,
        path: String,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<()> {
        let profile =
            Profile::from_yaml_file(&path).map_err(|e| fdo::Error::Failed(e.to_string()))?;
        self.runtime
            .load_profile(profile)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        self.profile_path = Some(path);
        self.profile_name_changed(&emitter).await?;
        self.modes_changed(&emitter).await?;
        self.current_mode_changed(&emitter).await?;
        Ok(())
    }

    /// Stop a running macro playback. Returns false if it was not running.
    async fn terminate_macro(&self, id: u64) -> fdo::Result<bool> {
        self.runtime
            .terminate_macro(id)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Return every logical device input to its default state
    async fn reset_logical_device(&self) -> fdo::Result<()> {
        self.runtime
            .reset_logical_device()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Pause or resume input processing
    async fn set_paused(&self, paused: bool) -> fdo::Result<()> {
        self.runtime
            .set_paused(paused)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Stop the remapper
    async fn stop(&self) -> fdo::Result<()> {
        self.runtime
            .stop()
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }
}
