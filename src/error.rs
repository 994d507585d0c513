//! Error taxonomy for pitch detection sessions.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PitchError {
    /// Session parameters that can never produce a working pipeline.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A block was rejected; the session window is left untouched.
    #[error("malformed block: {0}")]
    MalformedBlock(String),
}

pub type Result<T> = std::result::Result<T, PitchError>;
