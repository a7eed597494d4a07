//! Broadcast relay for chatline clients.
//!
//! The relay accepts TCP connections speaking the line-delimited JSON
//! protocol of `chatline-protocol` and fans every chat message out to all
//! connected members:
//! - a `join` record becomes a "<name> joined the chat" system notice
//! - `message` records are re-broadcast to everyone, the sender included
//! - a member leaving is announced as "<name> left the chat"
//!
//! # Example
//!
//! ```rust,no_run
//! use chatline_server::{RelayServer, ServerConfig, SignalHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener()?;
//!
//!     let server = RelayServer::bind(ServerConfig::new("127.0.0.1:12345")).await?;
//!     server.run_until_shutdown(signals.shutdown().wait()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod signals;
mod socket;

pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use signals::{ShutdownSignal, SignalHandler};
pub use socket::{Connection, RelayServer};
