//! Read-only connectivity check against the venue.
//!
//! Reports the clock offset, the instrument's precision and its current
//! ticker. Uses public endpoints only and never places an order.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use launch_core::{InstrumentKind, InstrumentMetadata, Symbol, SystemClock};
use launch_engine::{resolve_precision, ClockSynchronizer};
use launch_exchange::{ExchangeClient, OkxClient, OkxConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Probe venue connectivity without trading", long_about = None)]
struct Args {
    /// Pair to look up; overrides the config file
    #[arg(short, long)]
    pair: Option<String>,

    /// Configuration file path (can also be set via LAUNCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    launch_telemetry::init_logging()?;

    let config_path = args
        .config
        .or_else(|| std::env::var("LAUNCH_CONFIG").ok());
    let config = config_path
        .as_deref()
        .map(launch_bot::AppConfig::from_file)
        .transpose()?;

    let pair = args
        .pair
        .or_else(|| config.as_ref().map(|c| c.pair.clone()))
        .context("no pair given: pass --pair or a config file")?;
    let symbol = Symbol::parse(&pair)?;

    let okx_config: OkxConfig = config
        .as_ref()
        .map(|c| c.okx_config())
        .unwrap_or_default();
    let retry = config
        .as_ref()
        .map(|c| c.retry_policy())
        .unwrap_or_default();

    info!(base_url = %okx_config.base_url, symbol = %symbol, "Probing venue");
    let client = Arc::new(OkxClient::public(okx_config)?);
    let cancel = CancellationToken::new();

    let offset = ClockSynchronizer::new(client.clone(), Arc::new(SystemClock), retry)
        .synchronize(&cancel)
        .await?;
    info!(offset = %offset, "Clock offset");

    let instruments = client.list_instruments(InstrumentKind::Spot).await?;
    match InstrumentMetadata::find(&instruments, &symbol) {
        Some(meta) => {
            let precision = resolve_precision(meta);
            info!(
                tick_size = %meta.tick_size,
                lot_size = %meta.lot_size,
                min_size = ?meta.min_size.map(|s| s.to_string()),
                state = ?meta.state,
                price_decimals = precision.price_decimals,
                qty_decimals = precision.qty_decimals,
                "Instrument listed"
            );

            let quote = client.ticker(&symbol).await?;
            match quote.live_price() {
                Some(price) => info!(last = %price, "Ticker"),
                None => warn!(last = %quote.last, "No live price yet"),
            }
        }
        None => warn!(
            listed = instruments.len(),
            "Instrument not listed"
        ),
    }

    Ok(())
}
