//! Scripted in-memory exchange for tests.
//!
//! Each operation has its own response script. Responses are consumed in
//! order; once a script is down to its last entry that entry repeats for
//! every further call. An empty script falls back to a benign default.
//!
//! Venue time advances with `tokio::time`, so tests running with paused
//! time see the mock clock move as timers auto-advance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use launch_core::{
    InstrumentKind, InstrumentMetadata, OrderId, OrderSnapshot, OrderState, PriceQuote,
    SubmitAck, Symbol, TimeOffset,
};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::client::{BoxFuture, ExchangeClient, PlaceOrderRequest};
use crate::error::{ExchangeError, ExchangeResult};

#[derive(Debug)]
struct Script<T>(VecDeque<ExchangeResult<T>>);

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self(VecDeque::new())
    }

    fn next(&mut self) -> Option<ExchangeResult<T>> {
        if self.0.len() > 1 {
            self.0.pop_front()
        } else {
            self.0.front().cloned()
        }
    }
}

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub server_time: AtomicUsize,
    pub list_instruments: AtomicUsize,
    pub ticker: AtomicUsize,
    pub place_order: AtomicUsize,
    pub order_status: AtomicUsize,
    pub cancel_order: AtomicUsize,
}

/// Mock exchange for testing.
#[derive(Debug)]
pub struct MockExchange {
    /// Venue time at construction.
    base_time_ms: i64,
    started: Instant,
    server_time: Mutex<Script<i64>>,
    instruments: Mutex<Script<Vec<InstrumentMetadata>>>,
    tickers: Mutex<Script<String>>,
    submissions: Mutex<Script<SubmitAck>>,
    statuses: Mutex<Script<OrderSnapshot>>,
    cancels: Mutex<Script<bool>>,
    /// Recorded order submissions for verification.
    placed: Mutex<Vec<PlaceOrderRequest>>,
    /// Recorded cancel requests.
    cancelled: Mutex<Vec<OrderId>>,
    /// Offset attached to the most recent authenticated call.
    last_offset: Mutex<Option<TimeOffset>>,
    calls: CallCounts,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new(Utc::now().timestamp_millis())
    }
}

impl MockExchange {
    /// Create a mock whose venue clock starts at `base_time_ms`.
    pub fn new(base_time_ms: i64) -> Self {
        Self {
            base_time_ms,
            started: Instant::now(),
            server_time: Mutex::new(Script::new()),
            instruments: Mutex::new(Script::new()),
            tickers: Mutex::new(Script::new()),
            submissions: Mutex::new(Script::new()),
            statuses: Mutex::new(Script::new()),
            cancels: Mutex::new(Script::new()),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            last_offset: Mutex::new(None),
            calls: CallCounts::default(),
        }
    }

    /// Current mock venue time.
    pub fn venue_now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.base_time_ms.saturating_add(elapsed)
    }

    /// Queue a server-time failure. Once the queue drains the mock clock answers.
    pub fn push_server_time_error(&self, error: ExchangeError) {
        self.server_time.lock().0.push_back(Err(error));
    }

    /// Queue an instrument listing response.
    pub fn push_instruments(&self, response: ExchangeResult<Vec<InstrumentMetadata>>) {
        self.instruments.lock().0.push_back(response);
    }

    /// Queue a ticker response; the string is the raw `last` field.
    pub fn push_ticker(&self, response: ExchangeResult<&str>) {
        self.tickers
            .lock()
            .0
            .push_back(response.map(str::to_string));
    }

    /// Queue a submission response.
    pub fn push_submission(&self, response: ExchangeResult<SubmitAck>) {
        self.submissions.lock().0.push_back(response);
    }

    /// Queue an order-status response.
    pub fn push_status(&self, response: ExchangeResult<OrderSnapshot>) {
        self.statuses.lock().0.push_back(response);
    }

    /// Queue a cancel response.
    pub fn push_cancel(&self, response: ExchangeResult<bool>) {
        self.cancels.lock().0.push_back(response);
    }

    /// Get recorded submissions.
    pub fn placed_orders(&self) -> Vec<PlaceOrderRequest> {
        self.placed.lock().clone()
    }

    /// Get recorded cancel requests.
    pub fn cancel_requests(&self) -> Vec<OrderId> {
        self.cancelled.lock().clone()
    }

    pub fn last_offset(&self) -> Option<TimeOffset> {
        *self.last_offset.lock()
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Shorthand for reading one counter.
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn record_offset(&self, offset: TimeOffset) {
        *self.last_offset.lock() = Some(offset);
    }
}

impl ExchangeClient for MockExchange {
    fn server_time(&self) -> BoxFuture<'_, ExchangeResult<i64>> {
        Box::pin(async move {
            self.calls.server_time.fetch_add(1, Ordering::SeqCst);
            // Errors are consumed one by one; the clock is the fallback.
            let queued = self.server_time.lock().0.pop_front();
            match queued {
                Some(result) => result,
                None => Ok(self.venue_now_ms()),
            }
        })
    }

    fn list_instruments(
        &self,
        _kind: InstrumentKind,
    ) -> BoxFuture<'_, ExchangeResult<Vec<InstrumentMetadata>>> {
        Box::pin(async move {
            self.calls.list_instruments.fetch_add(1, Ordering::SeqCst);
            self.instruments.lock().next().unwrap_or_else(|| Ok(Vec::new()))
        })
    }

    fn ticker<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<PriceQuote>> {
        Box::pin(async move {
            self.calls.ticker.fetch_add(1, Ordering::SeqCst);
            let last = self
                .tickers
                .lock()
                .next()
                .unwrap_or_else(|| Ok(String::new()))?;
            Ok(PriceQuote {
                symbol: symbol.clone(),
                last,
                fetched_at: Utc::now(),
            })
        })
    }

    fn place_limit_order<'a>(
        &'a self,
        offset: TimeOffset,
        request: &'a PlaceOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<SubmitAck>> {
        Box::pin(async move {
            let n = self.calls.place_order.fetch_add(1, Ordering::SeqCst) + 1;
            self.record_offset(offset);
            self.placed.lock().push(request.clone());
            self.submissions
                .lock()
                .next()
                .unwrap_or_else(|| Ok(SubmitAck::Accepted(OrderId::new(format!("mock-{n}")))))
        })
    }

    fn order_status<'a>(
        &'a self,
        offset: TimeOffset,
        _symbol: &'a Symbol,
        _order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<OrderSnapshot>> {
        Box::pin(async move {
            self.calls.order_status.fetch_add(1, Ordering::SeqCst);
            self.record_offset(offset);
            self.statuses
                .lock()
                .next()
                .unwrap_or_else(|| Ok(OrderSnapshot::new(OrderState::Submitted)))
        })
    }

    fn cancel_order<'a>(
        &'a self,
        offset: TimeOffset,
        _symbol: &'a Symbol,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<bool>> {
        Box::pin(async move {
            self.calls.cancel_order.fetch_add(1, Ordering::SeqCst);
            self.record_offset(offset);
            self.cancelled.lock().push(order_id.clone());
            self.cancels.lock().next().unwrap_or(Ok(true))
        })
    }
}
