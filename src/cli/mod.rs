pub mod mode;
pub mod profile;

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use mode::{handle_mode, ModeCommand};
use profile::{handle_check, handle_modes, handle_profiles};
use zbus::{names::BusName, Connection};

use crate::{
    config::{path::find_profile, LoadError, Profile},
    constants::BUS_NAME,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the remapper with the given profile
    Run {
        /// Profile name or path to a profile file
        profile: String,
        /// Read JSON encoded input events from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write emitted events to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Expose the control interface on the session bus
        #[arg(long)]
        dbus: bool,
    },
    /// Validate one or more profiles
    Check {
        /// Profile names or paths to profile files
        #[arg(required = true)]
        profiles: Vec<String>,
    },
    /// List the modes of a profile
    Modes {
        /// Profile name or path to a profile file
        profile: String,
    },
    /// List all profiles found in the profile search paths
    Profiles,
    /// Query or change the mode of a running remapper
    Mode {
        #[command(subcommand)]
        cmd: ModeCommand,
    },
}

/// Handle every command that does not start the remapper
pub async fn main_cli(cmd: Commands) -> Result<(), Box<dyn Error>> {
    match cmd {
        Commands::Run { .. } => (),
        Commands::Check { profiles } => handle_check(profiles)?,
        Commands::Modes { profile } => handle_modes(profile)?,
        Commands::Profiles => handle_profiles(),
        Commands::Mode { cmd } => {
            let connection = Connection::session().await?;
            if !is_running(&connection).await {
                return Err("joyweave is not currently running".into());
            }
            handle_mode(connection, cmd).await?;
        }
    }

    Ok(())
}

/// Load a profile given either its name or a path to the file
pub fn load_profile(name: &str) -> Result<(PathBuf, Profile), LoadError> {
    let Some(path) = find_profile(name) else {
        return Err(LoadError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no profile named '{name}'"),
        )));
    };
    let profile = Profile::from_yaml_file(&path)?;
    Ok((path, profile))
}

/// Returns true if a remapper currently owns the bus name
async fn is_running(conn: &Connection) -> bool {
    let Ok(bus) = BusName::try_from(BUS_NAME) else {
        return false;
    };
    let dbus = zbus::fdo::DBusProxy::new(conn).await.ok();
    let Some(dbus) = dbus else {
        return false;
    };
    dbus.name_has_owner(bus).await.unwrap_or_default()
}
