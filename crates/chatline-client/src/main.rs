//! chatline CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use chatline_client::cli::{Cli, Command, ConfigAction};
use chatline_client::commands::{self, chat::ChatOutcome};
use chatline_client::config::ClientConfig;
use chatline_client::error::{ClientError, ClientResult};
use chatline_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Already reported in the chat output.
        Err(ClientError::Connect(_) | ClientError::Login(_) | ClientError::ConnectionLost) => {
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let source = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() || source.exists() {
        ClientConfig::load_from(&source).map_err(ClientError::Config)?
    } else {
        ClientConfig::default()
    };

    let logging = if cli.debug_enabled(&config) {
        TracingConfig::client_debug()
    } else {
        TracingConfig::client()
    };
    init_tracing(logging)?;

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &source, &mut stdout),
            ConfigAction::Validate => commands::config::validate(&config, &mut stdout),
            ConfigAction::Path => commands::config::path(&source, &mut stdout),
        },
        Some(Command::Chat) | None => {
            let form = cli.login_form(&config);
            match commands::chat::run(form).await? {
                ChatOutcome::Quit => Ok(()),
                ChatOutcome::ConnectionLost => Err(ClientError::ConnectionLost),
            }
        }
    }
}
