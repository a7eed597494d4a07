//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the relay.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, connection).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Could not bind the listening address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Logging could not be set up.
    #[error(transparent)]
    Tracing(#[from] chatline_core::TracingError),

    /// The relay is shutting down.
    #[error("Server shutdown requested")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error for `addr`.
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}
