//! Launch sell bot - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Sell a new listing the moment it starts trading
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via LAUNCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    launch_telemetry::init_logging()?;

    info!("Starting launch bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > LAUNCH_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("LAUNCH_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = launch_bot::AppConfig::from_file(&config_path)?;
    info!(
        pair = %config.pair,
        quantity = %config.quantity,
        offset_percent = %config.offset_percent,
        launch_time = ?config.launch_time,
        "Configuration loaded"
    );

    let app = launch_bot::Application::new(config)?;
    app.install_interrupt_handler();
    app.run().await?;

    Ok(())
}
