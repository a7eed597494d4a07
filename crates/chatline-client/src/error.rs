//! Client error types.
//!
//! Connection setup and sending have their own small taxonomies so callers
//! can react to each case; [`ClientError`] wraps them for the binary.

use std::time::Duration;

use thiserror::Error;

use chatline_core::TracingError;
use chatline_protocol::ProtocolError;

use crate::login::LoginError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Why a connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The transport did not complete the connection within the bound.
    #[error("connection to {target} timed out after {}ms", .after.as_millis())]
    Timeout { target: String, after: Duration },

    /// The peer actively rejected the connection.
    #[error("connection to {target} refused")]
    Refused { target: String },

    /// Any other failure: resolution, routing, or the join write itself.
    #[error("connection to {target} failed: {cause}")]
    Transport { target: String, cause: String },
}

impl ConnectError {
    /// Classifies an IO error raised while connecting.
    pub fn from_io(target: impl Into<String>, err: std::io::Error) -> Self {
        let target = target.into();
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => Self::Refused { target },
            std::io::ErrorKind::TimedOut => Self::Timeout {
                target,
                after: Duration::ZERO,
            },
            _ => Self::Transport {
                target,
                cause: err.to_string(),
            },
        }
    }

    /// Creates a transport error.
    pub fn transport(target: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Transport {
            target: target.into(),
            cause: cause.into(),
        }
    }
}

/// Why an outgoing event was not written.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session is closed.
    #[error("not connected")]
    NotConnected,

    /// The event could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transport rejected the write.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the `chatline` binary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Login form was rejected before connecting.
    #[error("{0}")]
    Login(#[from] LoginError),

    /// Connection could not be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The relay went away mid-chat.
    #[error("connection to the relay was lost")]
    ConnectionLost,

    /// IO error on the terminal.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialised.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}
