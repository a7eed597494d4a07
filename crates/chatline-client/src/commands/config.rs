//! `chatline config` subcommands.

use std::io::Write;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration as TOML, headed by where it came from.
pub fn dump(config: &ClientConfig, source: &Path, out: &mut impl Write) -> ClientResult<()> {
    let body = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {e}")))?;
    writeln!(out, "# {}", source.display())?;
    write!(out, "{body}")?;
    Ok(())
}

/// Checks the configuration and reports the result.
pub fn validate(config: &ClientConfig, out: &mut impl Write) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;
    writeln!(out, "Configuration is valid.")?;
    Ok(())
}

/// Prints the configuration file location and whether it exists.
pub fn path(source: &Path, out: &mut impl Write) -> ClientResult<()> {
    let state = if source.exists() { "" } else { " (not created)" };
    writeln!(out, "{}{state}", source.display())?;
    Ok(())
}
