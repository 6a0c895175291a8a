//! Order lifecycle: submit, supervise, cancel on timeout.
//!
//! ```text
//! Submitted ──► Filled
//!     │    └──► Canceled / Rejected   (reported by the venue)
//!     ▼
//! TimedOut ──cancel + re-check──► Filled | Canceled | Unresolved
//! ```
//!
//! After a timeout the cancel request can race a fill on the venue side.
//! The state is re-read once after the cancel returns; if neither the
//! cancel nor the re-read settles it the outcome is `Unresolved` and left
//! to the operator.

use std::fmt;
use std::time::Duration;

use launch_core::{
    ClientOrderId, OrderId, OrderIntent, OrderSnapshot, OrderState, SubmitAck, Symbol,
    TimeOffset,
};
use launch_exchange::{DynExchangeClient, PlaceOrderRequest};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::retry::{sleep_or_cancel, RetryOutcome, RetryPolicy};

/// Timing and attempt limits for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// How long the order may stay open before it is cancelled.
    pub timeout: Duration,
    /// Pause between status reads.
    pub poll_interval: Duration,
    /// Submission attempts, counting only explicit venue rejections.
    pub submit_attempts: u32,
    /// Pause between rejected submission attempts.
    pub submit_retry_pause: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            submit_attempts: 3,
            submit_retry_pause: Duration::from_millis(200),
        }
    }
}

/// How the order concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Filled,
    Canceled,
    Rejected,
    /// Neither the cancel nor the follow-up read settled the order.
    Unresolved(String),
}

impl OrderOutcome {
    /// Whether the operator should treat the run as successful.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled)
    }
}

impl fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filled => f.write_str("filled"),
            Self::Canceled => f.write_str("canceled"),
            Self::Rejected => f.write_str("rejected"),
            Self::Unresolved(reason) => write!(f, "unresolved ({reason})"),
        }
    }
}

/// An order the venue accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub client_order_id: ClientOrderId,
    /// Submission attempts used, including the accepted one.
    pub attempts: u32,
}

/// Result of supervising an order to a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervision {
    pub outcome: OrderOutcome,
    pub last_snapshot: Option<OrderSnapshot>,
    pub timed_out: bool,
    pub status_polls: u32,
}

/// Everything known about the order once the lifecycle ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReport {
    pub order_id: OrderId,
    pub client_order_id: ClientOrderId,
    pub intent: OrderIntent,
    pub outcome: OrderOutcome,
    pub last_snapshot: Option<OrderSnapshot>,
    pub timed_out: bool,
    pub status_polls: u32,
    pub submit_attempts: u32,
}

/// Owns the order from submission to a terminal state.
pub struct OrderLifecycleManager {
    exchange: DynExchangeClient,
    retry: RetryPolicy,
    config: LifecycleConfig,
    offset: TimeOffset,
}

impl OrderLifecycleManager {
    pub fn new(
        exchange: DynExchangeClient,
        retry: RetryPolicy,
        config: LifecycleConfig,
        offset: TimeOffset,
    ) -> Self {
        Self {
            exchange,
            retry,
            config,
            offset,
        }
    }

    /// One submission attempt.
    ///
    /// A transport failure is fatal: the venue may or may not have created
    /// the order.
    pub async fn submit(&self, request: &PlaceOrderRequest) -> EngineResult<SubmitAck> {
        debug!(
            symbol = %request.intent.symbol,
            client_order_id = %request.client_order_id,
            price = %request.intent.price,
            quantity = %request.intent.quantity,
            "Submitting limit sell"
        );

        self.exchange
            .place_limit_order(self.offset, request)
            .await
            .map_err(|e| {
                error!(
                    client_order_id = %request.client_order_id,
                    error = %e,
                    "Submission outcome unknown"
                );
                EngineError::SubmissionFailed(e)
            })
    }

    /// Submit, retrying only explicit rejections.
    pub async fn submit_with_attempts(
        &self,
        intent: &OrderIntent,
        cancel: &CancellationToken,
    ) -> EngineResult<PlacedOrder> {
        let max_attempts = self.config.submit_attempts.max(1);
        let mut last_rejection = (String::new(), String::new());

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let request = PlaceOrderRequest::new(intent.clone());
            match self.submit(&request).await? {
                SubmitAck::Accepted(order_id) => {
                    info!(
                        order_id = %order_id,
                        client_order_id = %request.client_order_id,
                        attempt,
                        "Order accepted"
                    );
                    return Ok(PlacedOrder {
                        order_id,
                        client_order_id: request.client_order_id,
                        attempts: attempt,
                    });
                }
                SubmitAck::Rejected { code, message } => {
                    warn!(attempt, max_attempts, %code, %message, "Order rejected");
                    last_rejection = (code, message);
                }
            }

            if attempt < max_attempts
                && !sleep_or_cancel(self.config.submit_retry_pause, cancel).await
            {
                return Err(EngineError::Cancelled);
            }
        }

        let (code, message) = last_rejection;
        Err(EngineError::AllSubmissionsRejected {
            attempts: max_attempts,
            code,
            message,
        })
    }

    async fn read_status(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        cancel: &CancellationToken,
    ) -> RetryOutcome<OrderSnapshot> {
        let exchange = self.exchange.as_ref();
        let offset = self.offset;
        self.retry
            .run("order_status", cancel, move || {
                exchange.order_status(offset, symbol, order_id)
            })
            .await
    }

    async fn request_cancel(&self, symbol: &Symbol, order_id: &OrderId) -> bool {
        let exchange = self.exchange.as_ref();
        let offset = self.offset;
        // Cleanup must finish even when the run itself is being cancelled.
        let never = CancellationToken::new();
        match self
            .retry
            .run("cancel_order", &never, move || {
                exchange.cancel_order(offset, symbol, order_id)
            })
            .await
        {
            RetryOutcome::Success(accepted) => accepted,
            RetryOutcome::Unavailable { last_error, .. } => {
                warn!(order_id = %order_id, error = %last_error, "Cancel request failed");
                false
            }
            RetryOutcome::Cancelled => false,
        }
    }

    /// Poll until the order is terminal or the timeout expires.
    pub async fn await_terminal(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        cancel: &CancellationToken,
    ) -> EngineResult<Supervision> {
        let deadline = Instant::now() + self.config.timeout;
        let mut polls = 0;
        let mut last_snapshot: Option<OrderSnapshot> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let pause = self.config.poll_interval.min(deadline - now);
            if !sleep_or_cancel(pause, cancel).await {
                self.cancel_on_shutdown(symbol, order_id).await;
                return Err(EngineError::Cancelled);
            }

            polls += 1;
            let snapshot = match self.read_status(symbol, order_id, cancel).await {
                RetryOutcome::Success(snapshot) => snapshot,
                RetryOutcome::Unavailable { last_error, .. } => {
                    warn!(order_id = %order_id, poll = polls, error = %last_error, "Order status unavailable");
                    continue;
                }
                RetryOutcome::Cancelled => {
                    self.cancel_on_shutdown(symbol, order_id).await;
                    return Err(EngineError::Cancelled);
                }
            };

            debug!(
                order_id = %order_id,
                poll = polls,
                state = %snapshot.state,
                filled = %snapshot.filled_size,
                "Order status"
            );

            let outcome = match snapshot.state {
                OrderState::Filled => Some(OrderOutcome::Filled),
                OrderState::Canceled => Some(OrderOutcome::Canceled),
                OrderState::Rejected => Some(OrderOutcome::Rejected),
                OrderState::Submitted | OrderState::TimedOut => None,
            };
            last_snapshot = Some(snapshot);

            if let Some(outcome) = outcome {
                info!(order_id = %order_id, outcome = %outcome, polls, "Order reached terminal state");
                return Ok(Supervision {
                    outcome,
                    last_snapshot,
                    timed_out: false,
                    status_polls: polls,
                });
            }
        }

        warn!(
            order_id = %order_id,
            state = %OrderState::TimedOut,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Order timed out, cancelling"
        );
        let (outcome, recheck) = self.resolve_timeout(symbol, order_id).await;
        Ok(Supervision {
            outcome,
            last_snapshot: recheck.or(last_snapshot),
            timed_out: true,
            status_polls: polls + 1,
        })
    }

    /// Cancel, then read the state once to settle the race with a fill.
    async fn resolve_timeout(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
    ) -> (OrderOutcome, Option<OrderSnapshot>) {
        let cancel_accepted = self.request_cancel(symbol, order_id).await;
        let never = CancellationToken::new();
        let recheck = self.read_status(symbol, order_id, &never).await.ok();
        let recheck_state = recheck.as_ref().map(|s| s.state);

        let outcome = match recheck_state {
            Some(OrderState::Filled) => OrderOutcome::Filled,
            _ if cancel_accepted => OrderOutcome::Canceled,
            Some(OrderState::Canceled) => OrderOutcome::Canceled,
            Some(state) => OrderOutcome::Unresolved(format!(
                "cancel refused and order still {state}"
            )),
            None => OrderOutcome::Unresolved(
                "cancel refused and order status unavailable".to_string(),
            ),
        };

        match &outcome {
            OrderOutcome::Unresolved(reason) => {
                error!(order_id = %order_id, %reason, "Order state unresolved, check the venue manually");
            }
            other => {
                info!(order_id = %order_id, outcome = %other, cancel_accepted, "Timeout resolved");
            }
        }

        (outcome, recheck)
    }

    async fn cancel_on_shutdown(&self, symbol: &Symbol, order_id: &OrderId) {
        info!(order_id = %order_id, "Shutdown requested, cancelling open order");
        if !self.request_cancel(symbol, order_id).await {
            warn!(order_id = %order_id, "Best-effort cancel on shutdown did not succeed");
        }
    }

    /// Submit `intent` and supervise it to a terminal outcome.
    pub async fn execute(
        &self,
        intent: OrderIntent,
        cancel: &CancellationToken,
    ) -> EngineResult<OrderReport> {
        let placed = self.submit_with_attempts(&intent, cancel).await?;
        let supervision = self
            .await_terminal(&intent.symbol, &placed.order_id, cancel)
            .await?;

        Ok(OrderReport {
            order_id: placed.order_id,
            client_order_id: placed.client_order_id,
            intent,
            outcome: supervision.outcome,
            last_snapshot: supervision.last_snapshot,
            timed_out: supervision.timed_out,
            status_polls: supervision.status_polls,
            submit_attempts: placed.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_core::{Price, Size};
    use launch_exchange::{ExchangeError, MockExchange};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn intent() -> OrderIntent {
        OrderIntent::limit_sell(
            Symbol::parse("XYZ-USDT").unwrap(),
            Size::new(dec!(100)),
            Price::new(dec!(0.4950)),
        )
        .unwrap()
    }

    fn manager(mock: &Arc<MockExchange>) -> OrderLifecycleManager {
        OrderLifecycleManager::new(
            mock.clone(),
            RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(20)),
            LifecycleConfig {
                timeout: Duration::from_secs(3),
                poll_interval: Duration::from_millis(500),
                submit_attempts: 3,
                submit_retry_pause: Duration::from_millis(200),
            },
            TimeOffset::from_millis(120),
        )
    }

    fn snapshot(state: OrderState) -> OrderSnapshot {
        OrderSnapshot::new(state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_before_timeout() {
        let mock = Arc::new(MockExchange::default());
        mock.push_submission(Ok(SubmitAck::Accepted(OrderId::new("42"))));
        mock.push_status(Ok(snapshot(OrderState::Submitted)));
        mock.push_status(Ok(snapshot(OrderState::Filled)));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Filled);
        assert_eq!(report.order_id, OrderId::new("42"));
        assert_eq!(report.status_polls, 2);
        assert!(!report.timed_out);
        assert!(mock.cancel_requests().is_empty());
        assert_eq!(mock.last_offset(), Some(TimeOffset::from_millis(120)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_retried_with_fresh_client_id() {
        let mock = Arc::new(MockExchange::default());
        mock.push_submission(Ok(SubmitAck::Rejected {
            code: "51008".into(),
            message: "Insufficient balance".into(),
        }));
        mock.push_submission(Ok(SubmitAck::Accepted(OrderId::new("7"))));

        let placed = manager(&mock)
            .submit_with_attempts(&intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(placed.attempts, 2);
        let placed_orders = mock.placed_orders();
        assert_eq!(placed_orders.len(), 2);
        assert_ne!(
            placed_orders[0].client_order_id,
            placed_orders[1].client_order_id
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_rejected() {
        let mock = Arc::new(MockExchange::default());
        mock.push_submission(Ok(SubmitAck::Rejected {
            code: "51000".into(),
            message: "Parameter error".into(),
        }));

        let err = manager(&mock)
            .submit_with_attempts(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::AllSubmissionsRejected { attempts: 3, ref code, .. } if code == "51000"
        ));
        assert_eq!(MockExchange::count(&mock.calls().place_order), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_transport_failure_not_retried() {
        let mock = Arc::new(MockExchange::default());
        mock.push_submission(Err(ExchangeError::Timeout("10s".into())));

        let err = manager(&mock)
            .submit_with_attempts(&intent(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::SubmissionFailed(_)));
        assert_eq!(MockExchange::count(&mock.calls().place_order), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancel_succeeds() {
        let mock = Arc::new(MockExchange::default());
        // Live for every poll, and still live on the re-check.
        mock.push_status(Ok(snapshot(OrderState::Submitted)));
        mock.push_cancel(Ok(true));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Canceled);
        assert!(report.timed_out);
        assert_eq!(mock.cancel_requests(), vec![OrderId::new("mock-1")]);
        // 3s timeout at 500ms intervals, plus the re-check.
        assert_eq!(report.status_polls, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_fill_at_timeout_is_cancelled() {
        let mock = Arc::new(MockExchange::default());
        mock.push_status(Ok(OrderSnapshot {
            state: OrderState::Submitted,
            filled_size: Size::new(dec!(40)),
            avg_fill_price: Some(Price::new(dec!(0.4950))),
        }));
        mock.push_cancel(Ok(true));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Canceled);
        assert!(report.timed_out);
        let last = report.last_snapshot.unwrap();
        assert_eq!(last.filled_size, Size::new(dec!(40)));
        assert_eq!(last.avg_fill_price, Some(Price::new(dec!(0.4950))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fill_wins_race() {
        let mock = Arc::new(MockExchange::default());
        for _ in 0..6 {
            mock.push_status(Ok(snapshot(OrderState::Submitted)));
        }
        mock.push_status(Ok(snapshot(OrderState::Filled)));
        mock.push_cancel(Ok(false));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Filled);
        assert!(report.timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fill_after_accepted_cancel() {
        let mock = Arc::new(MockExchange::default());
        for _ in 0..6 {
            mock.push_status(Ok(snapshot(OrderState::Submitted)));
        }
        mock.push_status(Ok(snapshot(OrderState::Filled)));
        mock.push_cancel(Ok(true));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Filled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancel_refused_but_order_canceled() {
        let mock = Arc::new(MockExchange::default());
        for _ in 0..6 {
            mock.push_status(Ok(snapshot(OrderState::Submitted)));
        }
        mock.push_status(Ok(snapshot(OrderState::Canceled)));
        mock.push_cancel(Ok(false));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_unresolved() {
        let mock = Arc::new(MockExchange::default());
        mock.push_status(Ok(snapshot(OrderState::Submitted)));
        mock.push_cancel(Err(ExchangeError::Api {
            code: "51400".into(),
            message: "Cancellation failed".into(),
        }));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(report.outcome, OrderOutcome::Unresolved(_)));
        assert!(!report.outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_venue_cancel_is_terminal() {
        let mock = Arc::new(MockExchange::default());
        mock.push_status(Ok(snapshot(OrderState::Canceled)));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Canceled);
        assert_eq!(report.status_polls, 1);
        assert!(mock.cancel_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_status_keeps_polling() {
        let mock = Arc::new(MockExchange::default());
        // Two failures exhaust one retried read.
        mock.push_status(Err(ExchangeError::Timeout("slow".into())));
        mock.push_status(Err(ExchangeError::Timeout("slow".into())));
        mock.push_status(Ok(snapshot(OrderState::Filled)));

        let report = manager(&mock)
            .execute(intent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, OrderOutcome::Filled);
        assert_eq!(report.status_polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_open_order() {
        let mock = Arc::new(MockExchange::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            trigger.cancel();
        });

        let err = manager(&mock).execute(intent(), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(mock.cancel_requests(), vec![OrderId::new("mock-1")]);
    }
}
