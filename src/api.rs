//! HTTP client for the REE "datos" hourly price API
//!
//! Issues the single GET the application needs, with the mapped retry and
//! timeout plans applied in-client: callers see one call that either yields
//! the decoded payload or a fetch error with retries already exhausted.

use crate::config::ApiConfig;
use crate::error::{Result, VatioError};
use crate::policy::{FailureKind, RetryPlan, TimeoutPlan, build_retry_plan, build_timeout_plan};
use crate::series::{PriceSeries, build_series};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::{Client, redirect};
use serde_json::Value;
use tokio::time::sleep;

/// The upstream endpoint requires timestamps in this fixed offset,
/// independent of the caller's local timezone
const REFERENCE_OFFSET_SECONDS: i32 = 2 * 3600;

/// Fixed UTC+2 reference offset for query timestamps
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECONDS).unwrap()
}

/// Today's calendar date in the reference offset
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&reference_offset()).date_naive()
}

/// Query bounds for one selected day: 00:00:00 to 23:59:00 in the
/// reference offset
pub fn day_bounds(date: NaiveDate) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let offset = reference_offset();
    let start = date
        .and_hms_opt(0, 0, 0)?
        .and_local_timezone(offset)
        .single()?;
    let end = date
        .and_hms_opt(23, 59, 0)?
        .and_local_timezone(offset)
        .single()?;
    Some((start, end))
}

/// Serialize an instant the way the endpoint expects: shifted into the
/// reference offset, truncated to whole seconds, offset suffix stripped.
pub fn normalise_datetime_field(instant: DateTime<FixedOffset>) -> String {
    instant
        .with_timezone(&reference_offset())
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Provider of one day's price series; the seam between the refresh
/// coordinator and the HTTP client
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch and build every series for the given day. The result is fully
    /// materialized: a parse failure anywhere discards the whole day.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PriceSeries>>;
}

/// Client for the hourly price endpoint
pub struct PricesApi {
    url: String,
    retry: RetryPlan,
    http: Client,
    logger: crate::logging::StructuredLogger,
}

/// One failed attempt; `retry` is `None` for terminal failures
struct AttemptFailure {
    retry: Option<RetryableKind>,
    error: VatioError,
}

enum RetryableKind {
    Transport(FailureKind),
    Status(u16),
}

impl PricesApi {
    /// Build a client from the declarative API configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let retry = build_retry_plan(&config.retry);
        let timeout = build_timeout_plan(&config.timeout);
        let http = build_http_client(&retry, &timeout)?;
        Ok(Self {
            url: config.url.clone(),
            retry,
            http,
            logger: crate::logging::get_logger("api"),
        })
    }

    /// Fetch the raw payload for the given bounds.
    ///
    /// The configured retry plan governs re-attempts transparently; the
    /// returned error means the budget is exhausted or the failure was
    /// terminal (malformed or empty body).
    pub async fn get(
        &self,
        date_from: DateTime<FixedOffset>,
        date_to: DateTime<FixedOffset>,
    ) -> Result<Value> {
        let start_date = normalise_datetime_field(date_from);
        let end_date = normalise_datetime_field(date_to);
        let query = [
            ("start_date", start_date.as_str()),
            ("end_date", end_date.as_str()),
            ("time_trunc", "hour"),
        ];
        self.logger.debug(&format!(
            "Api request: {} (start_date: {}, end_date: {})",
            self.url, start_date, end_date
        ));

        let mut budget = self.retry.clone();
        let mut previous_retries = 0u32;
        loop {
            let failure = match self.attempt(&query).await {
                Ok(payload) => return Ok(payload),
                Err(failure) => failure,
            };

            let may_retry = match failure.retry {
                None => false,
                Some(RetryableKind::Transport(kind)) => budget.consume(kind, "GET"),
                Some(RetryableKind::Status(code)) => {
                    budget.retries_status(code) && budget.consume(FailureKind::Status, "GET")
                }
            };
            if !may_retry {
                return Err(failure.error);
            }

            if let Some(delay) = budget.backoff_delay(previous_retries) {
                sleep(delay).await;
            }
            previous_retries += 1;
            self.logger.debug(&format!(
                "Retrying request (attempt {}): {}",
                previous_retries + 1,
                failure.error
            ));
        }
    }

    /// One request/decode cycle
    async fn attempt(&self, query: &[(&str, &str)]) -> std::result::Result<Value, AttemptFailure> {
        let response = self
            .http
            .get(self.url.as_str())
            .query(query)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure {
                retry: Some(RetryableKind::Status(status.as_u16())),
                error: VatioError::fetch(format!("request failed with status {}", status)),
            });
        }

        let body = response.bytes().await.map_err(transport_failure)?;
        let text = std::str::from_utf8(&body).map_err(|e| AttemptFailure {
            retry: None,
            error: VatioError::fetch(format!("response is not valid UTF-8: {}", e)),
        })?;
        self.logger.trace(&format!("Response from the API: {}", text));

        let payload: Value = serde_json::from_str(text).map_err(|e| AttemptFailure {
            retry: None,
            error: VatioError::fetch(format!("response is not valid JSON: {}", e)),
        })?;
        if is_empty_payload(&payload) {
            return Err(AttemptFailure {
                retry: None,
                error: VatioError::fetch("empty JSON response"),
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl PriceSource for PricesApi {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PriceSeries>> {
        let (date_from, date_to) = day_bounds(date)
            .ok_or_else(|| VatioError::validation("date", "no valid bounds for the day"))?;
        let payload = self.get(date_from, date_to).await?;
        let series = build_series(&payload)?.collect::<Result<Vec<_>>>()?;
        self.logger.debug(&format!(
            "Fetched {} series for {}",
            series.len(),
            date
        ));
        Ok(series)
    }
}

fn build_http_client(retry: &RetryPlan, timeout: &TimeoutPlan) -> Result<Client> {
    let mut builder =
        Client::builder().redirect(redirect::Policy::limited(retry.redirect_limit as usize));
    if let Some(total) = timeout.total {
        builder = builder.timeout(total);
    }
    if let Some(connect) = timeout.connect {
        builder = builder.connect_timeout(connect);
    }
    if let Some(read) = timeout.read {
        builder = builder.read_timeout(read);
    }
    Ok(builder.build()?)
}

fn transport_failure(error: reqwest::Error) -> AttemptFailure {
    let kind = if error.is_timeout() {
        FailureKind::Read
    } else if error.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Other
    };
    AttemptFailure {
        retry: Some(RetryableKind::Transport(kind)),
        error: VatioError::fetch(error.to_string()),
    }
}

/// A decoded-but-empty body is as useless as no body at all
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
