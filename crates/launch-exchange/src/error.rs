//! Exchange client error types.

use thiserror::Error;

/// OKX error codes that signal a transient overload rather than a refusal.
const TRANSIENT_API_CODES: &[&str] = &[
    "50001", // service temporarily unavailable
    "50011", // rate limit reached
    "50013", // system busy
];

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

impl ExchangeError {
    /// Whether repeating the same idempotent request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpClient(_) | Self::Timeout(_) | Self::Decode(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Api { code, .. } => TRANSIENT_API_CODES.contains(&code.as_str()),
            Self::Credentials(_) | Self::Signing(_) => false,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::HttpClient(e.to_string())
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
