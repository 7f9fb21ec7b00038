use std::{net::SocketAddr, str::FromStr};

use azurerm_mock::{MockArm, MockOptions};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Fake Azure Resource Manager for local runs of the azurerm CLI
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, env = "AZURERM_MOCK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "AZURERM_MOCK_PORT", default_value = "8443")]
    port: u16,

    /// Bearer token to issue and accept
    #[arg(long, env = "AZURERM_MOCK_TOKEN", default_value = "mock-token")]
    token: String,

    /// Complete every write synchronously
    #[arg(long)]
    synchronous: bool,

    /// Items per list page
    #[arg(long, default_value = "50")]
    page_size: usize,

    /// Logging level (info, debug, trace)
    #[arg(long, env = "AZURERM_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = Level::from_str(cli.log_level.to_lowercase().as_str()).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let addr: SocketAddr = match format!("{}:{}", cli.host, cli.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse socket address: {}", e);
            std::process::exit(1);
        }
    };

    let options = MockOptions {
        token: cli.token,
        long_running: !cli.synchronous,
        page_size: cli.page_size,
        ..MockOptions::default()
    };

    let arm = match MockArm::bind(addr, options).await {
        Ok(arm) => arm,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!(endpoint = %arm.endpoint(), "Fake ARM started, press Ctrl+C to stop");
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal");
    }

    arm.shutdown().await;
    info!("Fake ARM shut down");
}
