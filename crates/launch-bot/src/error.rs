//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] launch_exchange::ExchangeError),

    #[error("Engine error: {0}")]
    Engine(#[from] launch_engine::EngineError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] launch_telemetry::TelemetryError),

    #[error("Order ended {0}")]
    Outcome(String),
}

pub type AppResult<T> = Result<T, AppError>;
