//! The launch sell flow end to end.
//!
//! clock sync -> countdown -> listing poll -> price poll -> target price ->
//! quantization -> order lifecycle. Each stage starts only after the
//! previous one has produced its value.

use std::sync::Arc;
use std::time::Duration;

use launch_core::{
    Clock, InstrumentKind, InstrumentMetadata, LaunchSchedule, Price, PriceQuote, Size, Symbol,
    TimeOffset,
};
use launch_exchange::DynExchangeClient;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock_sync::ClockSynchronizer;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{LifecycleConfig, OrderLifecycleManager, OrderReport};
use crate::poller::{poll_until, Readiness};
use crate::precision::{
    build_sell_intent, compute_target_price, resolve_precision, validate_offset_percent,
    Precision,
};
use crate::retry::RetryPolicy;
use crate::scheduler::LaunchScheduler;

/// What to sell, when, and how patiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub symbol: Symbol,
    pub quantity: Size,
    /// Percent below the first live price.
    pub offset_percent: Decimal,
    /// Countdown to run first; `None` starts polling immediately.
    pub schedule: Option<LaunchSchedule>,
    pub pair_check_interval: Duration,
    pub price_check_interval: Duration,
    pub lifecycle: LifecycleConfig,
}

impl LaunchPlan {
    /// Reject plans that could never produce a valid order.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.quantity.is_positive() {
            return Err(EngineError::InvalidParameter(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        validate_offset_percent(self.offset_percent)?;
        if self.pair_check_interval.is_zero() || self.price_check_interval.is_zero() {
            return Err(EngineError::InvalidParameter(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        if self.lifecycle.timeout.is_zero() || self.lifecycle.poll_interval.is_zero() {
            return Err(EngineError::InvalidParameter(
                "order timeout and poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub offset: TimeOffset,
    pub metadata: InstrumentMetadata,
    pub precision: Precision,
    pub market_price: Price,
    pub target_price: Price,
    pub listing_polls: u32,
    pub price_polls: u32,
    pub order: OrderReport,
}

pub struct LaunchCoordinator {
    exchange: DynExchangeClient,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl LaunchCoordinator {
    pub fn new(exchange: DynExchangeClient, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            exchange,
            clock,
            retry,
        }
    }

    /// Run the whole launch sell once.
    pub async fn run(
        &self,
        plan: &LaunchPlan,
        cancel: &CancellationToken,
    ) -> EngineResult<LaunchReport> {
        plan.validate()?;
        info!(
            symbol = %plan.symbol,
            quantity = %plan.quantity,
            offset_percent = %plan.offset_percent,
            launch_at = ?plan.schedule.as_ref().map(|s| s.launch_at),
            "Starting launch sell"
        );

        let offset = ClockSynchronizer::new(self.exchange.clone(), self.clock.clone(), self.retry)
            .synchronize(cancel)
            .await?;

        if let Some(schedule) = &plan.schedule {
            LaunchScheduler::new(self.exchange.clone(), self.clock.clone())
                .await_launch_window(schedule, offset, cancel)
                .await?;
        }

        let (instruments, listing_polls) = self.await_listing(plan, cancel).await?;
        let metadata = InstrumentMetadata::find(&instruments, &plan.symbol)
            .cloned()
            .ok_or_else(|| EngineError::MissingMetadata(plan.symbol.clone()))?;
        let precision = resolve_precision(&metadata);
        info!(
            tick_size = %metadata.tick_size,
            lot_size = %metadata.lot_size,
            price_decimals = precision.price_decimals,
            qty_decimals = precision.qty_decimals,
            "Instrument listed"
        );

        let (market_price, price_polls) = self.await_live_price(plan, cancel).await?;
        let target_price = compute_target_price(market_price, plan.offset_percent)?;
        let intent = build_sell_intent(&metadata, plan.quantity, target_price)?;
        info!(
            market_price = %market_price,
            target_price = %target_price,
            price = %intent.price,
            quantity = %intent.quantity,
            "Order prepared"
        );

        let order = OrderLifecycleManager::new(
            self.exchange.clone(),
            self.retry,
            plan.lifecycle,
            offset,
        )
        .execute(intent, cancel)
        .await?;

        Ok(LaunchReport {
            offset,
            metadata,
            precision,
            market_price,
            target_price,
            listing_polls,
            price_polls,
            order,
        })
    }

    async fn await_listing(
        &self,
        plan: &LaunchPlan,
        cancel: &CancellationToken,
    ) -> EngineResult<(Vec<InstrumentMetadata>, u32)> {
        let exchange = self.exchange.as_ref();
        let retry = self.retry;
        let symbol = &plan.symbol;

        let polled = poll_until(
            "listing",
            plan.pair_check_interval,
            cancel,
            move || {
                retry.run("list_instruments", cancel, move || {
                    exchange.list_instruments(InstrumentKind::Spot)
                })
            },
            |instruments: Vec<InstrumentMetadata>| {
                if InstrumentMetadata::find(&instruments, symbol).is_some() {
                    Readiness::Ready(instruments)
                } else {
                    Readiness::Waiting(format!(
                        "{symbol} not among {} listed instruments",
                        instruments.len()
                    ))
                }
            },
        )
        .await?;

        Ok((polled.value, polled.fetches))
    }

    async fn await_live_price(
        &self,
        plan: &LaunchPlan,
        cancel: &CancellationToken,
    ) -> EngineResult<(Price, u32)> {
        let exchange = self.exchange.as_ref();
        let retry = self.retry;
        let symbol = &plan.symbol;

        let polled = poll_until(
            "price",
            plan.price_check_interval,
            cancel,
            move || retry.run("ticker", cancel, move || exchange.ticker(symbol)),
            |quote: PriceQuote| match quote.live_price() {
                Some(price) => Readiness::Ready(price),
                None => Readiness::Waiting(format!("last price {:?} not yet available", quote.last)),
            },
        )
        .await?;

        Ok((polled.value, polled.fetches))
    }
}
