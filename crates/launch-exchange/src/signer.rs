//! OKX request signing.
//!
//! Every private REST call carries four headers:
//! - `OK-ACCESS-KEY`: API key
//! - `OK-ACCESS-TIMESTAMP`: ISO-8601 UTC with milliseconds (`2020-12-08T09:08:57.715Z`)
//! - `OK-ACCESS-SIGN`: `base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))`
//! - `OK-ACCESS-PASSPHRASE`: passphrase chosen when the key was created
//!
//! The timestamp is local time corrected by the synchronized `TimeOffset`;
//! the venue rejects requests whose timestamp drifts too far from its clock.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use launch_core::{Clock, TimeOffset};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ExchangeError, ExchangeResult};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OKX_API_KEY";
/// Environment variable holding the API secret.
pub const API_SECRET_VAR: &str = "OKX_API_SECRET";
/// Environment variable holding the API passphrase.
pub const API_PASSPHRASE_VAR: &str = "OKX_PASSPHRASE";

/// API credentials.
///
/// Secret material is wiped on drop and never printed.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    secret: Zeroizing<String>,
    passphrase: Zeroizing<String>,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret: Zeroizing::new(secret.into()),
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    /// Load credentials from `OKX_API_KEY`, `OKX_API_SECRET`, `OKX_PASSPHRASE`.
    pub fn from_env() -> ExchangeResult<Self> {
        fn read(var: &str) -> ExchangeResult<String> {
            let value = std::env::var(var)
                .map_err(|_| ExchangeError::Credentials(format!("{var} is not set")))?;
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ExchangeError::Credentials(format!("{var} is empty")));
            }
            Ok(trimmed.to_string())
        }

        Ok(Self::new(
            read(API_KEY_VAR)?,
            read(API_SECRET_VAR)?,
            read(API_PASSPHRASE_VAR)?,
        ))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API key safe for logs: only the last 4 characters of keys longer than 8.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked_api_key())
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Format a venue-time millisecond timestamp the way OKX expects.
pub fn format_timestamp(venue_ms: i64) -> ExchangeResult<String> {
    let ts = DateTime::<Utc>::from_timestamp_millis(venue_ms)
        .ok_or_else(|| ExchangeError::Signing(format!("timestamp out of range: {venue_ms}")))?;
    Ok(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Compute the `OK-ACCESS-SIGN` value.
///
/// `request_path` includes the query string for GET requests; `body` is the
/// exact JSON text sent (empty for GET).
pub fn sign(
    secret: &str,
    timestamp: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> ExchangeResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Signing(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Authentication headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub signature: String,
    pub passphrase: String,
}

impl AuthHeaders {
    /// Header name/value pairs in wire form.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("OK-ACCESS-KEY", self.api_key.as_str()),
            ("OK-ACCESS-SIGN", self.signature.as_str()),
            ("OK-ACCESS-TIMESTAMP", self.timestamp.as_str()),
            ("OK-ACCESS-PASSPHRASE", self.passphrase.as_str()),
        ]
    }
}

/// Signs requests with the operator's credentials.
pub struct RequestSigner {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    pub fn new(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self { credentials, clock }
    }

    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    /// Build the authentication headers for a request, stamping it with
    /// local time corrected by `offset`.
    pub fn headers(
        &self,
        offset: TimeOffset,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> ExchangeResult<AuthHeaders> {
        let timestamp = format_timestamp(offset.apply(self.clock.now_ms()))?;
        let signature = sign(
            &self.credentials.secret,
            &timestamp,
            method,
            request_path,
            body,
        )?;
        Ok(AuthHeaders {
            api_key: self.credentials.api_key.clone(),
            timestamp,
            signature,
            passphrase: self.credentials.passphrase.to_string(),
        })
    }
}
