use std::error::Error;

use clap::Subcommand;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};
use zbus::Connection;

use crate::dbus::interface::remapper::RemapperInterfaceProxy;

#[derive(Subcommand, Debug, Clone)]
pub enum ModeCommand {
    /// Display the active mode and all available modes
    List,
    /// Get the name of the active mode
    Get,
    /// Switch to the given mode
    Set { mode: String },
    /// Switch to the mode after the active one in the given list
    Cycle {
        #[arg(required = true)]
        modes: Vec<String>,
    },
    /// Apply the auto switch rules for the given process name
    Focus { process: String },
}

#[derive(Tabled)]
struct ModeRow {
    #[tabled(rename = "Mode")]
    name: String,
    #[tabled(rename = "Active")]
    active: String,
}

pub async fn handle_mode(conn: Connection, cmd: ModeCommand) -> Result<(), Box<dyn Error>> {
    let remapper = RemapperInterfaceProxy::new(&conn).await?;
    match cmd {
        ModeCommand::List => {
            let current = remapper.current_mode().await?;
            let rows: Vec<ModeRow> = remapper
                .modes()
                .await?
                .into_iter()
                .map(|name| ModeRow {
                    active: if name == current { "*".to_string() } else { String::new() },
                    name,
                })
                .collect();
            let profile = remapper.profile_name().await.unwrap_or_default();

            let mut table = Table::new(rows);
            table
                .with(Style::modern_rounded())
                .with(Panel::header(profile));
            println!("{table}");
        }
        ModeCommand::Get => println!("{}", remapper.current_mode().await?),
        ModeCommand::Set { mode } => {
            remapper.switch_mode(mode.clone()).await?;
            println!("Switched to mode: {mode}");
        }
        ModeCommand::Cycle { modes } => {
            remapper.cycle_modes(modes).await?;
            println!("Switched to mode: {}", remapper.current_mode().await?);
        }
        ModeCommand::Focus { process } => {
            let mode = remapper.set_focused_process(process.clone()).await?;
            if mode.is_empty() {
                println!("No auto switch rule matches '{process}'");
            } else {
                println!("Switched to mode: {mode}");
            }
        }
    }

    Ok(())
}
