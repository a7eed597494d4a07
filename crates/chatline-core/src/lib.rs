//! Core helpers shared by the chatline crates: tracing setup and timestamps.

pub mod time;
pub mod tracing;

pub use time::{clock_label, timestamp_now};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
