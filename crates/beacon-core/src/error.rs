//! Error types for beacon

use thiserror::Error;

/// Result type alias for beacon operations
pub type BeaconResult<T> = Result<T, BeaconError>;

/// Main error type for beacon
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid pixel name: {0}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BeaconError {
    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new invalid-name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
