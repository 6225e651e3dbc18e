//! Crate-level error type.
//!
//! Module errors convert into [`Error`] so callers can use `?` across
//! collection, encoding and configuration.

use thiserror::Error;

use crate::collect::CollectError;
use crate::config::ConfigError;
use crate::encoder::EncodeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, Error>;
