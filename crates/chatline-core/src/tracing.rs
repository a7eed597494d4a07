//! Tracing setup for chatline.
//!
//! Both binaries log through `tracing`. The chat client owns stdout for the
//! conversation itself, so every format here writes to stderr.
//!
//! ```ignore
//! use chatline_core::tracing::{init_tracing, TracingConfig};
//!
//! // Interactive client, quiet unless something goes wrong
//! init_tracing(TracingConfig::client())?;
//!
//! // Relay server with structured output
//! init_tracing(TracingConfig::server())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Crate-name prefix shared by every chatline log target.
const TARGET_PREFIX: &str = "chatline";

#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The filter directive does not parse.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One human-readable line per event.
    #[default]
    Compact,
    /// JSON lines, for the relay under a supervisor.
    Json,
}

/// How logs are filtered and laid out.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for chatline targets when neither `directive` nor `RUST_LOG` is set.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Print module path, file and line with each event.
    pub verbose_metadata: bool,
    pub timestamps: bool,
    /// Log span open/close, useful to follow connections on the relay.
    pub span_events: bool,
    /// Explicit filter directive; wins over `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Compact,
            verbose_metadata: false,
            timestamps: true,
            span_events: false,
            directive: None,
        }
    }
}

impl TracingConfig {
    /// Interactive client: warnings only, no timestamps.
    #[must_use]
    pub fn client() -> Self {
        Self {
            level: Level::WARN,
            timestamps: false,
            ..Self::default()
        }
    }

    /// Interactive client with `--debug`.
    #[must_use]
    pub fn client_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose_metadata: true,
            ..Self::client()
        }
    }

    /// Relay server.
    #[must_use]
    pub fn server() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            verbose_metadata: true,
            span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets an explicit filter directive such as `chatline_client=trace`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match self.directive {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{TARGET_PREFIX}={}", self.level)))),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Call once at startup.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.verbose_metadata)
        .with_file(config.verbose_metadata)
        .with_line_number(config.verbose_metadata)
        .with_span_events(span_events);

    let layer = match (config.format, config.timestamps) {
        (TracingOutputFormat::Json, _) => layer.json().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_is_quiet() {
        let config = TracingConfig::client();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, TracingOutputFormat::Compact);
        assert!(!config.timestamps);
        assert!(!config.verbose_metadata);
    }

    #[test]
    fn client_debug_adds_detail() {
        let config = TracingConfig::client_debug();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.verbose_metadata);
        assert!(!config.timestamps);
    }

    #[test]
    fn server_logs_json_with_spans() {
        let config = TracingConfig::server();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, TracingOutputFormat::Json);
        assert!(config.span_events);
        assert!(config.timestamps);
    }

    #[test]
    fn builders_override_presets() {
        let config = TracingConfig::server()
            .with_level(Level::DEBUG)
            .with_format(TracingOutputFormat::Compact)
            .with_directive("chatline_server=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, TracingOutputFormat::Compact);
        assert_eq!(config.directive.as_deref(), Some("chatline_server=trace"));
        assert!(config.filter().is_ok());
    }

    #[test]
    fn bad_directive_is_rejected() {
        let config = TracingConfig::client().with_directive("chatline=notalevel");
        assert!(matches!(config.filter(), Err(TracingError::EnvFilter(_))));
    }
}
