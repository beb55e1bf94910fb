use tokio::sync::{broadcast, mpsc};

use crate::{
    config::Profile,
    input::{
        event::Event,
        logical_device::{Cell, InputType},
        macros::{Macro, PlaybackId},
    },
};

/// Runtime commands define all the different ways to interact with a running
/// [super::Runtime] over a channel. Commands are processed in order by the
/// dispatch task.
#[derive(Debug)]
pub enum RuntimeCommand {
    ProcessEvent(Event),
    GetCurrentMode(mpsc::Sender<String>),
    GetModeNames(mpsc::Sender<Vec<String>>),
    GetProfileName(mpsc::Sender<String>),
    SwitchMode(String, mpsc::Sender<Result<(), String>>),
    CycleModes(Vec<String>, mpsc::Sender<Result<(), String>>),
    SetFocusedProcess(String, mpsc::Sender<Result<Option<String>, String>>),
    LoadProfile(Box<Profile>, mpsc::Sender<Result<(), String>>),
    QueueMacro(Box<Macro>, mpsc::Sender<Result<PlaybackId, String>>),
    TerminateMacro(PlaybackId, mpsc::Sender<bool>),
    GetDefaultDelay(mpsc::Sender<f64>),
    SetDefaultDelay(f64),
    GetLogicalValue(InputType, u32, mpsc::Sender<Result<Cell, String>>),
    ResetLogicalDevice,
    SetPaused(bool),
    Subscribe(mpsc::Sender<broadcast::Receiver<Event>>),
    Stop,
}
