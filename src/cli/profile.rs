use std::error::Error;

use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::config::{path::get_profile_files, Profile};
use crate::input::dispatcher::Engine;

use super::load_profile;

#[derive(Tabled)]
struct ModeRow {
    #[tabled(rename = "Mode")]
    name: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Bindings")]
    bindings: usize,
    #[tabled(rename = "Start")]
    start: String,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Modes")]
    modes: usize,
    #[tabled(rename = "Path")]
    path: String,
}

/// Load and build every given profile, reporting all failures
pub fn handle_check(profiles: Vec<String>) -> Result<(), Box<dyn Error>> {
    let mut failed = 0;
    for name in profiles {
        let result = load_profile(&name)
            .map_err(|e| e.to_string())
            .and_then(|(path, profile)| {
                Engine::new(&profile)
                    .map(|_| (path, profile))
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok((path, profile)) => {
                println!("{}: OK ({} modes)", path.display(), profile.modes.len())
            }
            Err(e) => {
                println!("{name}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{failed} profile(s) failed validation").into());
    }
    Ok(())
}

pub fn handle_modes(name: String) -> Result<(), Box<dyn Error>> {
    let (_, profile) = load_profile(&name)?;
    let start = profile.start_mode().unwrap_or_default().to_string();
    let rows: Vec<ModeRow> = profile
        .modes
        .iter()
        .map(|mode| ModeRow {
            name: mode.name.clone(),
            parent: mode.parent.clone().unwrap_or_default(),
            bindings: mode.bindings.len(),
            start: if mode.name == start { "*".to_string() } else { String::new() },
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header(profile.name.as_str()));
    println!("{table}");
    Ok(())
}

pub fn handle_profiles() {
    let rows: Vec<ProfileRow> = get_profile_files()
        .into_iter()
        .filter_map(|path| match Profile::from_yaml_file(&path) {
            Ok(profile) => Some(ProfileRow {
                name: profile.name,
                modes: profile.modes.len(),
                path: path.display().to_string(),
            }),
            Err(e) => {
                log::warn!("Skipping invalid profile {path:?}: {e}");
                None
            }
        })
        .collect();
    let count = rows.len();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Profiles"));
    println!("{table}");
    println!("Found {count} profile(s)");
}
