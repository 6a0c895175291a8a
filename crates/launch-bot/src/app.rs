//! Application wiring: configuration, venue client, interrupt handling.

use std::sync::Arc;

use chrono::Utc;
use launch_core::{Clock, SystemClock};
use launch_engine::{LaunchCoordinator, LaunchReport};
use launch_exchange::{Credentials, DynExchangeClient, OkxClient};
use launch_telemetry::RunSummary;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Flatten a finished run into a log record.
pub fn summarize(report: &LaunchReport) -> RunSummary {
    let order = &report.order;
    RunSummary {
        symbol: order.intent.symbol.to_string(),
        outcome: order.outcome.to_string(),
        success: order.outcome.is_success(),
        order_id: order.order_id.to_string(),
        client_order_id: order.client_order_id.to_string(),
        market_price: report.market_price.to_string(),
        target_price: report.target_price.to_string(),
        order_price: order.intent.price.to_string(),
        quantity: order.intent.quantity.to_string(),
        filled_size: order.last_snapshot.as_ref().map(|s| s.filled_size.to_string()),
        avg_fill_price: order
            .last_snapshot
            .as_ref()
            .and_then(|s| s.avg_fill_price)
            .map(|p| p.to_string()),
        clock_offset_ms: report.offset.as_millis(),
        listing_polls: report.listing_polls,
        price_polls: report.price_polls,
        status_polls: order.status_polls,
        submit_attempts: order.submit_attempts,
        timed_out: order.timed_out,
        finished_at: Utc::now(),
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    exchange: DynExchangeClient,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl Application {
    /// Build against OKX using credentials from the environment.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let credentials = Credentials::from_env()?;
        info!(
            api_key = %credentials.masked_api_key(),
            base_url = %config.base_url,
            simulated = config.simulated,
            "Credentials loaded"
        );
        let client = OkxClient::new(config.okx_config(), credentials)?;
        Self::with_exchange(config, Arc::new(client))
    }

    /// Build against any exchange implementation.
    pub fn with_exchange(config: AppConfig, exchange: DynExchangeClient) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            exchange,
            clock: Arc::new(SystemClock),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the run when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the run on Ctrl-C.
    pub fn install_interrupt_handler(&self) {
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, shutting down");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
            }
        });
    }

    /// Run the launch sell once and log its summary.
    ///
    /// Outcomes other than filled or canceled are returned as errors.
    pub async fn run(&self) -> AppResult<LaunchReport> {
        let plan = self.config.launch_plan()?;
        let coordinator = LaunchCoordinator::new(
            self.exchange.clone(),
            self.clock.clone(),
            self.config.retry_policy(),
        );

        let report = coordinator.run(&plan, &self.shutdown).await?;
        summarize(&report).emit()?;

        if !report.order.outcome.is_success() {
            return Err(AppError::Outcome(report.order.outcome.to_string()));
        }
        Ok(report)
    }
}
