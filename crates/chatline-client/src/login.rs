//! Login form validation, done before any connection attempt.

use thiserror::Error;

/// Default relay host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default relay port.
pub const DEFAULT_PORT: u16 = 12345;

/// A rejected login form. Messages are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Please enter a username")]
    MissingUsername,
    #[error("Port must be a number")]
    InvalidPort,
}

/// A validated login: who to join as and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub username: String,
    pub host: String,
    pub port: u16,
}

impl Login {
    /// Validates raw form values.
    ///
    /// The username is trimmed and must not be empty. A blank host or port
    /// falls back to the defaults; a port must parse as 1 to 65535.
    pub fn parse(username: &str, host: &str, port: &str) -> Result<Self, LoginError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LoginError::MissingUsername);
        }

        let host = match host.trim() {
            "" => DEFAULT_HOST,
            host => host,
        };

        let port = match port.trim() {
            "" => DEFAULT_PORT,
            port => match port.parse::<u16>() {
                Ok(0) | Err(_) => return Err(LoginError::InvalidPort),
                Ok(port) => port,
            },
        };

        Ok(Self {
            username: username.to_string(),
            host: host.to_string(),
            port,
        })
    }
}
