pub mod cli;
pub mod config;
pub mod constants;
pub mod dbus;
pub mod input;
pub mod sync;
