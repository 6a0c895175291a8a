//! OKX v5 REST client.
//!
//! Implements [`ExchangeClient`] over the public market endpoints and the
//! private trade endpoints. Every response is wrapped in the v5 envelope
//! `{"code": "0", "msg": "", "data": [...]}`; a non-zero `code` is an API
//! error, except for order placement and cancellation where the per-item
//! `sCode`/`sMsg` carry the venue's verdict.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use launch_core::{
    InstrumentKind, InstrumentMetadata, OrderId, OrderSnapshot, OrderState, Price, PriceQuote,
    Size, SubmitAck, Symbol, SystemClock, TimeOffset,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{BoxFuture, ExchangeClient, PlaceOrderRequest};
use crate::error::{ExchangeError, ExchangeResult};
use crate::signer::{Credentials, RequestSigner};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";

const PATH_SERVER_TIME: &str = "/api/v5/public/time";
const PATH_INSTRUMENTS: &str = "/api/v5/public/instruments";
const PATH_TICKER: &str = "/api/v5/market/ticker";
const PATH_ORDER: &str = "/api/v5/trade/order";
const PATH_CANCEL_ORDER: &str = "/api/v5/trade/cancel-order";

/// Longest response body echoed back in errors.
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for [`OkxClient`].
#[derive(Debug, Clone)]
pub struct OkxConfig {
    /// REST base URL (e.g., "https://www.okx.com").
    pub base_url: String,
    /// Route orders to the demo-trading environment.
    pub simulated: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OkxConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            simulated: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// v5 response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(deserialize_with = "string_or_number")]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn is_ok(&self) -> bool {
        self.code == "0"
    }

    /// Unwrap `data`, turning a non-zero code into an API error.
    fn into_data(self) -> ExchangeResult<Vec<T>> {
        if !self.is_ok() {
            return Err(ExchangeError::Api {
                code: self.code,
                message: self.msg,
            });
        }
        Ok(self.data)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct RawServerTime {
    ts: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstrument {
    inst_id: String,
    tick_sz: String,
    lot_sz: String,
    #[serde(default)]
    min_sz: String,
    #[serde(default)]
    state: String,
}

impl RawInstrument {
    fn into_metadata(self) -> ExchangeResult<InstrumentMetadata> {
        let tick_size: Price = self.tick_sz.parse().map_err(|e| {
            ExchangeError::Decode(format!("{}: bad tickSz {:?}: {e}", self.inst_id, self.tick_sz))
        })?;
        let lot_size: Size = self.lot_sz.parse().map_err(|e| {
            ExchangeError::Decode(format!("{}: bad lotSz {:?}: {e}", self.inst_id, self.lot_sz))
        })?;
        if !tick_size.is_positive() || !lot_size.is_positive() {
            return Err(ExchangeError::Decode(format!(
                "{}: non-positive step (tickSz {:?}, lotSz {:?})",
                self.inst_id, self.tick_sz, self.lot_sz
            )));
        }
        let min_size = self.min_sz.parse::<Size>().ok().filter(|s| s.is_positive());
        let state = Some(self.state).filter(|s| !s.is_empty());

        Ok(InstrumentMetadata {
            symbol: Symbol::from_venue(self.inst_id),
            tick_size,
            lot_size,
            min_size,
            state,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default)]
    last: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawOrderAck {
    ord_id: String,
    s_code: String,
    s_msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderDetail {
    state: String,
    #[serde(default)]
    acc_fill_sz: String,
    #[serde(default)]
    avg_px: String,
}

/// Order placement body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderBody<'a> {
    inst_id: &'a str,
    td_mode: &'static str,
    side: &'static str,
    ord_type: &'static str,
    sz: String,
    px: String,
    cl_ord_id: &'a str,
}

impl<'a> PlaceOrderBody<'a> {
    fn from_request(request: &'a PlaceOrderRequest) -> Self {
        let intent = &request.intent;
        Self {
            inst_id: intent.symbol.as_str(),
            td_mode: "cash",
            side: intent.side.as_str(),
            ord_type: intent.order_type.as_str(),
            sz: intent.quantity.to_string(),
            px: intent.price.to_string(),
            cl_ord_id: request.client_order_id.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelOrderBody<'a> {
    inst_id: &'a str,
    ord_id: &'a str,
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> ExchangeResult<Envelope<T>> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !(200..300).contains(&status) => Err(ExchangeError::Status {
            status,
            body: truncate_body(body),
        }),
        Err(e) => Err(ExchangeError::Decode(format!(
            "{e}: {}",
            truncate_body(body)
        ))),
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

fn first<T>(data: Vec<T>, what: &str) -> ExchangeResult<T> {
    data.into_iter()
        .next()
        .ok_or_else(|| ExchangeError::Decode(format!("{what}: empty data array")))
}

fn parse_server_time(envelope: Envelope<RawServerTime>) -> ExchangeResult<i64> {
    let raw = first(envelope.into_data()?, "server time")?;
    raw.ts
        .parse::<i64>()
        .map_err(|e| ExchangeError::Decode(format!("bad server ts {:?}: {e}", raw.ts)))
}

fn parse_instruments(
    envelope: Envelope<RawInstrument>,
) -> ExchangeResult<Vec<InstrumentMetadata>> {
    let raw = envelope.into_data()?;
    let total = raw.len();
    let instruments: Vec<InstrumentMetadata> = raw
        .into_iter()
        .filter_map(|inst| match inst.into_metadata() {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!(error = %e, "Skipping malformed instrument");
                None
            }
        })
        .collect();

    if instruments.len() < total {
        warn!(
            total,
            parsed = instruments.len(),
            "Some instruments could not be parsed"
        );
    }
    Ok(instruments)
}

fn parse_ticker(symbol: &Symbol, envelope: Envelope<RawTicker>) -> ExchangeResult<PriceQuote> {
    let last = envelope
        .into_data()?
        .into_iter()
        .next()
        .map(|t| t.last)
        .unwrap_or_default();
    Ok(PriceQuote {
        symbol: symbol.clone(),
        last,
        fetched_at: Utc::now(),
    })
}

fn parse_submit_ack(envelope: Envelope<RawOrderAck>) -> ExchangeResult<SubmitAck> {
    let code = envelope.code;
    let msg = envelope.msg;
    match envelope.data.into_iter().next() {
        Some(ack) if code == "0" && ack.s_code == "0" && !ack.ord_id.is_empty() => {
            Ok(SubmitAck::Accepted(OrderId::new(ack.ord_id)))
        }
        Some(ack) if !ack.s_code.is_empty() && ack.s_code != "0" => Ok(SubmitAck::Rejected {
            code: ack.s_code,
            message: ack.s_msg,
        }),
        _ if code != "0" => Ok(SubmitAck::Rejected { code, message: msg }),
        _ => Err(ExchangeError::Decode(
            "order placement acknowledged without an order id".to_string(),
        )),
    }
}

fn map_order_state(state: &str) -> Option<OrderState> {
    match state {
        "live" | "partially_filled" => Some(OrderState::Submitted),
        "filled" => Some(OrderState::Filled),
        "canceled" | "mmp_canceled" => Some(OrderState::Canceled),
        _ => None,
    }
}

fn parse_order_snapshot(envelope: Envelope<RawOrderDetail>) -> ExchangeResult<OrderSnapshot> {
    let raw = first(envelope.into_data()?, "order status")?;
    let state = map_order_state(&raw.state)
        .ok_or_else(|| ExchangeError::Decode(format!("unknown order state {:?}", raw.state)))?;
    let filled_size = raw.acc_fill_sz.parse::<Size>().unwrap_or(Size::ZERO);
    let avg_fill_price = raw.avg_px.parse::<Price>().ok().filter(|p| p.is_positive());

    Ok(OrderSnapshot {
        state,
        filled_size,
        avg_fill_price,
    })
}

fn parse_cancel_ack(envelope: Envelope<RawOrderAck>) -> ExchangeResult<bool> {
    let code = envelope.code;
    let msg = envelope.msg;
    match envelope.data.into_iter().next() {
        Some(ack) if code == "0" && ack.s_code == "0" => Ok(true),
        Some(ack) => {
            warn!(code = %ack.s_code, msg = %ack.s_msg, "Cancel refused by venue");
            Ok(false)
        }
        None if code == "0" => Err(ExchangeError::Decode(
            "cancel acknowledged without a result".to_string(),
        )),
        None => Err(ExchangeError::Api { code, message: msg }),
    }
}

// ============================================================================
// Client
// ============================================================================

/// OKX REST client.
pub struct OkxClient {
    /// HTTP client.
    client: Client,
    config: OkxConfig,
    /// Absent for read-only use; private calls then fail with a credentials error.
    signer: Option<RequestSigner>,
}

impl OkxClient {
    /// Create a client that can trade.
    pub fn new(config: OkxConfig, credentials: Credentials) -> ExchangeResult<Self> {
        let signer = RequestSigner::new(credentials, Arc::new(SystemClock));
        Self::build(config, Some(signer))
    }

    /// Create a client limited to public endpoints.
    pub fn public(config: OkxConfig) -> ExchangeResult<Self> {
        Self::build(config, None)
    }

    fn build(config: OkxConfig, signer: Option<RequestSigner>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExchangeError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            signer,
        })
    }

    fn request(&self, method: Method, request_path: &str) -> RequestBuilder {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            request_path
        );
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        if self.config.simulated {
            builder.header("x-simulated-trading", "1")
        } else {
            builder
        }
    }

    fn signed(
        &self,
        offset: TimeOffset,
        method: Method,
        request_path: &str,
        body: &str,
    ) -> ExchangeResult<RequestBuilder> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Credentials("client was built without API credentials".to_string())
        })?;
        let headers = signer.headers(offset, method.as_str(), request_path, body)?;

        let mut builder = self.request(method, request_path);
        for (name, value) in headers.pairs() {
            builder = builder.header(name, value);
        }
        Ok(builder.body(body.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> ExchangeResult<Envelope<T>> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }

    async fn fetch_server_time(&self) -> ExchangeResult<i64> {
        let envelope = self
            .send(self.request(Method::GET, PATH_SERVER_TIME))
            .await?;
        parse_server_time(envelope)
    }

    async fn fetch_instruments(
        &self,
        kind: InstrumentKind,
    ) -> ExchangeResult<Vec<InstrumentMetadata>> {
        let path = format!("{PATH_INSTRUMENTS}?instType={kind}");
        let envelope = self.send(self.request(Method::GET, &path)).await?;
        let instruments = parse_instruments(envelope)?;
        debug!(kind = %kind, count = instruments.len(), "Fetched instruments");
        Ok(instruments)
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> ExchangeResult<PriceQuote> {
        let path = format!("{PATH_TICKER}?instId={symbol}");
        let envelope = self.send(self.request(Method::GET, &path)).await?;
        parse_ticker(symbol, envelope)
    }

    async fn submit_order(
        &self,
        offset: TimeOffset,
        request: &PlaceOrderRequest,
    ) -> ExchangeResult<SubmitAck> {
        let body = serde_json::to_string(&PlaceOrderBody::from_request(request))
            .map_err(|e| ExchangeError::Signing(format!("Failed to encode order: {e}")))?;
        let builder = self.signed(offset, Method::POST, PATH_ORDER, &body)?;
        parse_submit_ack(self.send(builder).await?)
    }

    async fn fetch_order(
        &self,
        offset: TimeOffset,
        symbol: &Symbol,
        order_id: &OrderId,
    ) -> ExchangeResult<OrderSnapshot> {
        let path = format!("{PATH_ORDER}?instId={symbol}&ordId={order_id}");
        let builder = self.signed(offset, Method::GET, &path, "")?;
        parse_order_snapshot(self.send(builder).await?)
    }

    async fn submit_cancel(
        &self,
        offset: TimeOffset,
        symbol: &Symbol,
        order_id: &OrderId,
    ) -> ExchangeResult<bool> {
        let body = serde_json::to_string(&CancelOrderBody {
            inst_id: symbol.as_str(),
            ord_id: order_id.as_str(),
        })
        .map_err(|e| ExchangeError::Signing(format!("Failed to encode cancel: {e}")))?;
        let builder = self.signed(offset, Method::POST, PATH_CANCEL_ORDER, &body)?;
        parse_cancel_ack(self.send(builder).await?)
    }
}

impl ExchangeClient for OkxClient {
    fn server_time(&self) -> BoxFuture<'_, ExchangeResult<i64>> {
        Box::pin(self.fetch_server_time())
    }

    fn list_instruments(
        &self,
        kind: InstrumentKind,
    ) -> BoxFuture<'_, ExchangeResult<Vec<InstrumentMetadata>>> {
        Box::pin(self.fetch_instruments(kind))
    }

    fn ticker<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<PriceQuote>> {
        Box::pin(self.fetch_ticker(symbol))
    }

    fn place_limit_order<'a>(
        &'a self,
        offset: TimeOffset,
        request: &'a PlaceOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<SubmitAck>> {
        Box::pin(self.submit_order(offset, request))
    }

    fn order_status<'a>(
        &'a self,
        offset: TimeOffset,
        symbol: &'a Symbol,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<OrderSnapshot>> {
        Box::pin(self.fetch_order(offset, symbol, order_id))
    }

    fn cancel_order<'a>(
        &'a self,
        offset: TimeOffset,
        symbol: &'a Symbol,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<bool>> {
        Box::pin(self.submit_cancel(offset, symbol, order_id))
    }
}
