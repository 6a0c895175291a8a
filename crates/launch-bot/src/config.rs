//! Application configuration.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use launch_core::{LaunchSchedule, Size, Symbol};
use launch_engine::{LaunchPlan, LifecycleConfig, RetryPolicy};
use launch_exchange::{OkxConfig, DEFAULT_BASE_URL};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// `launch_time` format without a zone; always read as UTC.
const LAUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// HTTP timeout for venue requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff settings for idempotent venue calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Launch sell configuration.
///
/// Credentials are never read from this file; see
/// [`launch_exchange::Credentials::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Trading pair, e.g. "ALT/USDT" or "ALT-USDT".
    pub pair: String,
    /// Amount of base currency to sell.
    #[serde(alias = "tokens_for_sale")]
    pub quantity: Decimal,
    /// Percent below the first live price (1.0 = 1%).
    #[serde(default, alias = "price_offset")]
    pub offset_percent: Decimal,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Send orders to the demo-trading environment.
    #[serde(default)]
    pub simulated: bool,
    /// Listing instant, UTC: "YYYY-MM-DD HH:MM:SS" or RFC 3339.
    /// Without it polling starts immediately.
    #[serde(default)]
    pub launch_time: Option<String>,
    /// Seconds before `launch_time` to start polling for the listing.
    #[serde(default = "default_pre_launch_secs", alias = "pre_launch_pooling")]
    pub pre_launch_secs: u64,
    #[serde(default = "default_launch_check_interval_ms")]
    pub launch_check_interval_ms: u64,
    #[serde(default = "default_pair_check_interval_ms")]
    pub pair_check_interval_ms: u64,
    #[serde(default = "default_price_check_interval_ms")]
    pub price_check_interval_ms: u64,
    /// Cancel the order if it is not filled within this many seconds.
    #[serde(default = "default_order_timeout_secs", alias = "order_timeout")]
    pub order_timeout_secs: u64,
    #[serde(default = "default_order_poll_interval_ms")]
    pub order_poll_interval_ms: u64,
    /// Submission attempts after explicit venue rejections.
    #[serde(default = "default_submit_attempts")]
    pub submit_attempts: u32,
    #[serde(default = "default_submit_retry_pause_ms")]
    pub submit_retry_pause_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_pre_launch_secs() -> u64 {
    10
}

fn default_launch_check_interval_ms() -> u64 {
    1_000
}

fn default_pair_check_interval_ms() -> u64 {
    500
}

fn default_price_check_interval_ms() -> u64 {
    1_000
}

fn default_order_timeout_secs() -> u64 {
    30
}

fn default_order_poll_interval_ms() -> u64 {
    500
}

fn default_submit_attempts() -> u32 {
    3
}

fn default_submit_retry_pause_ms() -> u64 {
    200
}

/// Parse "YYYY-MM-DD HH:MM:SS" (UTC) or RFC 3339.
pub fn parse_launch_time(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, LAUNCH_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            AppError::Config(format!(
                "launch_time {raw:?} is neither \"YYYY-MM-DD HH:MM:SS\" nor RFC 3339: {e}"
            ))
        })
}

impl AppConfig {
    /// Load from a specific file and validate.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text and validate.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.symbol()?;

        if self.quantity <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        launch_engine::validate_offset_percent(self.offset_percent)
            .map_err(|e| AppError::Config(e.to_string()))?;

        let intervals = [
            ("launch_check_interval_ms", self.launch_check_interval_ms),
            ("pair_check_interval_ms", self.pair_check_interval_ms),
            ("price_check_interval_ms", self.price_check_interval_ms),
            ("order_timeout_secs", self.order_timeout_secs),
            ("order_poll_interval_ms", self.order_poll_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{name} must be greater than 0")));
        }

        if self.submit_attempts == 0 {
            return Err(AppError::Config("submit_attempts must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url must not be empty".into()));
        }

        self.launch_at()?;
        Ok(())
    }

    /// Venue symbol for `pair`.
    pub fn symbol(&self) -> AppResult<Symbol> {
        Symbol::parse(&self.pair).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn launch_at(&self) -> AppResult<Option<DateTime<Utc>>> {
        self.launch_time
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_launch_time)
            .transpose()
    }

    pub fn launch_schedule(&self) -> AppResult<Option<LaunchSchedule>> {
        Ok(self.launch_at()?.map(|launch_at| LaunchSchedule {
            launch_at,
            pre_window: Duration::from_secs(self.pre_launch_secs),
            check_interval: Duration::from_millis(self.launch_check_interval_ms),
        }))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            timeout: Duration::from_secs(self.order_timeout_secs),
            poll_interval: Duration::from_millis(self.order_poll_interval_ms),
            submit_attempts: self.submit_attempts,
            submit_retry_pause: Duration::from_millis(self.submit_retry_pause_ms),
        }
    }

    pub fn launch_plan(&self) -> AppResult<LaunchPlan> {
        Ok(LaunchPlan {
            symbol: self.symbol()?,
            quantity: Size::new(self.quantity),
            offset_percent: self.offset_percent,
            schedule: self.launch_schedule()?,
            pair_check_interval: Duration::from_millis(self.pair_check_interval_ms),
            price_check_interval: Duration::from_millis(self.price_check_interval_ms),
            lifecycle: self.lifecycle(),
        })
    }

    pub fn okx_config(&self) -> OkxConfig {
        OkxConfig {
            base_url: self.base_url.clone(),
            simulated: self.simulated,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
pair = "ALT/USDT"
quantity = "100"
"#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.quantity, dec!(100));
        assert_eq!(config.offset_percent, Decimal::ZERO);
        assert_eq!(config.base_url, "https://www.okx.com");
        assert!(!config.simulated);
        assert_eq!(config.pre_launch_secs, 10);
        assert_eq!(config.pair_check_interval_ms, 500);
        assert_eq!(config.order_timeout_secs, 30);
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.launch_schedule().unwrap().is_none());
        assert_eq!(config.symbol().unwrap().as_str(), "ALT-USDT");
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml_str(
            r#"
pair = "alt-usdt"
quantity = 250.5
offset_percent = "1.0"
simulated = true
launch_time = "2025-05-29 12:00:00"
pre_launch_secs = 5
order_timeout_secs = 45

[retry]
max_attempts = 5
"#,
        )
        .unwrap();

        let plan = config.launch_plan().unwrap();
        assert_eq!(plan.symbol.as_str(), "ALT-USDT");
        assert_eq!(plan.quantity.inner(), dec!(250.5));
        assert_eq!(plan.offset_percent, dec!(1.0));
        assert_eq!(plan.lifecycle.timeout, Duration::from_secs(45));

        let schedule = plan.schedule.unwrap();
        assert_eq!(schedule.launch_at.to_rfc3339(), "2025-05-29T12:00:00+00:00");
        assert_eq!(schedule.pre_window, Duration::from_secs(5));

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert!(config.okx_config().simulated);
    }

    #[test]
    fn test_legacy_field_names() {
        let config = AppConfig::from_toml_str(
            r#"
pair = "ALT/USDT"
tokens_for_sale = "100"
price_offset = "2.5"
pre_launch_pooling = 20
order_timeout = 60
"#,
        )
        .unwrap();
        assert_eq!(config.quantity, dec!(100));
        assert_eq!(config.offset_percent, dec!(2.5));
        assert_eq!(config.pre_launch_secs, 20);
        assert_eq!(config.order_timeout_secs, 60);
    }

    #[test]
    fn test_launch_time_formats() {
        let plain = parse_launch_time("2025-05-29 12:00:00").unwrap();
        let rfc = parse_launch_time("2025-05-29T14:00:00+02:00").unwrap();
        assert_eq!(plain, rfc);
        assert!(parse_launch_time("29/05/2025 12:00").is_err());
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "pair = \"ALTUSDT\"\nquantity = \"1\"",
            "pair = \"ALT/USDT\"\nquantity = \"0\"",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\noffset_percent = \"100\"",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\noffset_percent = \"-1\"",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\npair_check_interval_ms = 0",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\nsubmit_attempts = 0",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\nlaunch_time = \"soon\"",
            "pair = \"ALT/USDT\"\nquantity = \"1\"\n[retry]\nmax_attempts = 0",
        ];
        for case in cases {
            assert!(
                matches!(AppConfig::from_toml_str(case), Err(AppError::Config(_))),
                "accepted invalid config: {case}"
            );
        }
    }

    #[test]
    fn test_shipped_default_config_loads() {
        let config =
            AppConfig::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.symbol().unwrap().as_str(), "ALT-USDT");
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.launch_schedule().unwrap().is_some());
    }

    #[test]
    fn test_missing_required_field() {
        assert!(AppConfig::from_toml_str("pair = \"ALT/USDT\"").is_err());
    }
}
