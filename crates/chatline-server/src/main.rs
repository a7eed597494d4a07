//! chatline-server entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, info};

use chatline_core::{TracingConfig, TracingOutputFormat, init_tracing};
use chatline_server::{DEFAULT_BIND_ADDR, RelayServer, ServerConfig, ServerResult, SignalHandler};

/// chatline-server - relay chat messages between connected clients
#[derive(Debug, Parser)]
#[command(name = "chatline-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, short, env = "CHATLINE_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Maximum concurrent clients
    #[arg(long, default_value_t = 100)]
    max_connections: usize,

    /// Enable debug output
    #[arg(long, short = 'v')]
    debug: bool,

    /// Log human-readable lines instead of JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> ServerResult<()> {
    let mut logging = TracingConfig::server();
    if args.debug {
        logging = logging.with_level(Level::DEBUG);
    }
    if args.pretty {
        logging = logging.with_format(TracingOutputFormat::Compact);
    }
    init_tracing(logging)?;

    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    let config = ServerConfig::new(args.bind).with_max_connections(args.max_connections);
    let server = RelayServer::bind(config).await?;
    server.run_until_shutdown(signals.shutdown().wait()).await?;

    info!("Relay stopped");
    Ok(())
}
