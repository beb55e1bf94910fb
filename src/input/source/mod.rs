//! Sources read physical input events and forward them to a runtime
pub mod json;


use thiserror::Error;

use super::runtime::client::ClientError;

/// Possible errors while reading from a source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read input: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to forward event: {0}")]
    ClientError(#[from] ClientError),
}
