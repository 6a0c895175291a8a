//! Launch timing and order lifecycle coordination.
//!
//! Components, leaves first:
//! - `retry`: exponential backoff for idempotent venue calls
//! - `clock_sync`: venue/local clock offset from one round trip
//! - `scheduler`: countdown to the launch window on venue time
//! - `poller`: generic poll-until-ready loop
//! - `precision`: target price and tick/lot quantization
//! - `lifecycle`: submission, supervision and timeout cancellation
//! - `coordinator`: the whole launch sell as one flow
//!
//! Every suspension point observes a `CancellationToken`.

pub mod clock_sync;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod precision;
pub mod retry;
pub mod scheduler;

pub use clock_sync::{offset_from_probe, ClockSynchronizer, OFFSET_WARN_THRESHOLD_MS};
pub use coordinator::{LaunchCoordinator, LaunchPlan, LaunchReport};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{
    LifecycleConfig, OrderLifecycleManager, OrderOutcome, OrderReport, PlacedOrder, Supervision,
};
pub use poller::{poll_until, Polled, Readiness};
pub use precision::{
    build_sell_intent, compute_target_price, resolve_precision, validate_offset_percent,
    Precision,
};
pub use retry::{sleep_or_cancel, RetryOutcome, RetryPolicy};
pub use scheduler::LaunchScheduler;
