//! Error types for yesdev.

use std::io;
use thiserror::Error;

use crate::session::SessionHandle;

/// Main error type for yesdev operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pattern cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Session lookup errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Device configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Pattern cache errors (allocation, transfers, positioning).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The pattern or the exploded buffer could not be allocated
    #[error("Out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The sink or source stopped accepting/supplying bytes
    #[error("Transfer fault after {delivered} bytes")]
    TransferFault { delivered: usize },

    /// Seek would move the cursor before the start
    #[error("Invalid seek offset {offset}")]
    InvalidSeek { offset: i128 },

    /// The stream has no end to seek relative to
    #[error("Seeking relative to the end is not supported")]
    SeekUnsupported,
}

/// Session registry errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Handle was never opened or has already been closed
    #[error("Session {0} not found")]
    NotFound(SessionHandle),
}

/// Device configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result type alias using yesdev's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Cache(CacheError::OutOfMemory { .. }) => io::ErrorKind::OutOfMemory,
            Error::Cache(CacheError::TransferFault { .. }) => io::ErrorKind::WriteZero,
            Error::Cache(CacheError::InvalidSeek { .. }) => io::ErrorKind::InvalidInput,
            Error::Cache(CacheError::SeekUnsupported) => io::ErrorKind::Unsupported,
            Error::Session(SessionError::NotFound(_)) => io::ErrorKind::NotFound,
            Error::Config(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}
