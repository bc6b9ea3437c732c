//! Error types for jukebox-vr
//!
//! Configuration and index errors are returned to the caller immediately;
//! backend errors are propagated and never retried.

use thiserror::Error;

/// Main error type for the vertical-remix engine
#[derive(Error, Debug)]
pub enum Error {
    /// Clip arrays empty or mismatched, or invalid engine settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Channel index beyond the fixed layer count
    #[error("Channel index {index} out of range (layer count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Audio backend resource unavailable or command failed
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// Operation not valid in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors from the shared library (config file loading)
    #[error(transparent)]
    Common(#[from] jukebox_common::Error),
}

/// Convenience Result type using the jukebox-vr Error
pub type Result<T> = std::result::Result<T, Error>;
