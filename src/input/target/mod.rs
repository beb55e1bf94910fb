//! Targets write the events emitted by a runtime to an output device
pub mod json;

#[cfg(test)]
pub mod json_test;

use thiserror::Error;

/// Possible errors while writing to a target
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("failed to write output: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to serialize event: {0}")]
    SerializeError(#[from] serde_json::Error),
}
