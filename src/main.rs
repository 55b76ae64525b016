//! Room Console
//!
//! Interactive WebSocket test console for room-based realtime backends.
//! Logs in over REST, opens a token-authenticated WebSocket, drives room
//! lifecycle requests, and displays classified responses and broadcasts.

mod api;
mod client;
mod config;
mod console;
mod jwt;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ConsoleConfig, CONFIG_FILE};
use console::Console;

/// Room Console
///
/// Interactive WebSocket test console for room-based realtime backends
#[derive(Parser, Debug)]
#[command(name = "room-console")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// WebSocket server URL (overrides the config file)
    #[arg(long)]
    server_url: Option<String>,

    /// REST API base URL (overrides the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Login path on the REST API (overrides the config file)
    #[arg(long)]
    login_endpoint: Option<String>,

    /// Bearer token to use instead of logging in
    #[arg(long)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Room Console v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ConsoleConfig::load(&args.config)?;
    if let Some(url) = args.server_url {
        config.websocket_url = url;
    }
    if let Some(url) = args.api_url {
        config.base_api = url;
    }
    if let Some(path) = args.login_endpoint {
        config.login_endpoint = path;
    }

    let console = Console::new(config, args.token);
    console.run().await
}
