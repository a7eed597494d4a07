//! Chat session layer and terminal client.
//!
//! [`Session`] connects to a relay, performs the join handshake and runs the
//! receive loop; decoded events reach the presentation context through a
//! [`Dispatcher`]/[`EventQueue`] pair and are handed to a
//! [`PresentationSink`]. The `chatline` binary wires these to a terminal.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod login;
pub mod session;
pub mod terminal;

pub use cli::Cli;
pub use dispatch::{Dispatcher, EventQueue, PresentationSink, SessionEvent, deliver};
pub use error::{ClientError, ClientResult, ConnectError, SendError};
pub use login::{Login, LoginError};
pub use session::{Session, SessionConfig, SessionState, generate_user_id};
