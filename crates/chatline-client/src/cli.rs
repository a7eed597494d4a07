//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;

/// chatline - join a chat room from the terminal
#[derive(Debug, Parser)]
#[command(name = "chatline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CHATLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Relay host
    #[arg(long, short = 'H', env = "CHATLINE_HOST")]
    pub host: Option<String>,

    /// Relay port
    #[arg(long, short, env = "CHATLINE_PORT")]
    pub port: Option<String>,

    /// Display name to join as
    #[arg(long, short, env = "CHATLINE_USERNAME")]
    pub username: Option<String>,

    /// Connection timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Connection parameters after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: Option<String>,
    pub host: String,
    pub port: String,
    pub connect_timeout: u64,
}

impl Cli {
    /// Merges flags over `config`. Values are still raw; see [`crate::login::Login`].
    pub fn login_form(&self, config: &ClientConfig) -> LoginForm {
        LoginForm {
            username: self
                .username
                .clone()
                .or_else(|| config.identity.username.clone()),
            host: self.host.clone().unwrap_or_else(|| config.server.host.clone()),
            port: self
                .port
                .clone()
                .unwrap_or_else(|| config.server.port.to_string()),
            connect_timeout: self.timeout.unwrap_or(config.server.connect_timeout).max(1),
        }
    }

    /// Returns true if debug logging was requested by flag or config.
    pub fn debug_enabled(&self, config: &ClientConfig) -> bool {
        self.debug || config.debug
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the chat (default)
    Chat,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
