//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/chatline/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [server]
//! host = "localhost"
//! port = 12345
//! connect_timeout = 3
//!
//! [identity]
//! username = "alice"
//! ```
//!
//! Command-line flags and `CHATLINE_*` environment variables override the
//! file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::login::{DEFAULT_HOST, DEFAULT_PORT};

/// Configuration for the chatline client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Relay connection settings.
    pub server: ServerSettings,

    /// Who to join as.
    pub identity: IdentitySettings,
}

/// Relay connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Relay host name or address.
    pub host: String,

    /// Relay TCP port.
    pub port: u16,

    /// Connection timeout in seconds.
    pub connect_timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: 3,
        }
    }
}

/// Identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Display name; prompted for when unset.
    pub username: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.trim().is_empty() {
            return Err("server.host must not be empty".to_string());
        }
        if self.server.port == 0 {
            return Err("server.port must be between 1 and 65535".to_string());
        }
        if self.server.connect_timeout == 0 {
            return Err("server.connect_timeout must be at least 1 second".to_string());
        }
        if let Some(ref name) = self.identity.username
            && name.trim().is_empty()
        {
            return Err("identity.username must not be blank".to_string());
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
    }
}
