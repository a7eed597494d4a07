//! Server configuration.

use crate::error::{ServerError, ServerResult};

/// Default listening address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:12345";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub bind_addr: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Events buffered per client before a slow reader starts missing them.
    pub backlog: usize,

    /// Largest accepted record, excluding the separator.
    pub max_record_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_connections: 100,
            backlog: 256,
            max_record_size: chatline_protocol::MAX_RECORD_SIZE,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration listening on `bind_addr`.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Default::default()
        }
    }

    /// Builder: set max connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set the per-client backlog.
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    /// Builder: set the record size limit.
    pub fn with_max_record_size(mut self, max: usize) -> Self {
        self.max_record_size = max;
        self
    }

    /// Rejects values the relay cannot run with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(ServerError::config("bind address must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        if self.backlog == 0 {
            return Err(ServerError::config("backlog must be at least 1"));
        }
        if self.max_record_size == 0 {
            return Err(ServerError::config("max_record_size must be at least 1"));
        }
        Ok(())
    }
}
