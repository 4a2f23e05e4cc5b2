//! HTTP plumbing shared by the providers: client construction and the
//! mapping of status codes onto [`FetchOutcome`].

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

use super::{FetchOutcome, ProviderError};
use crate::config::ProviderConfig;

pub const DEFAULT_USER_AGENT: &str = concat!("patentflow/", env!("CARGO_PKG_VERSION"));

pub fn build_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
        .build()
        .map_err(|e| ProviderError::Client {
            provider: config.kind,
            source: e,
        })
}

/// Maps a non-success response onto an outcome; `None` for 2xx.
///
/// 429 and 503 mean throttled, 404 and 410 mean the patent is not known
/// to the provider, anything else is an error.
pub fn classify_status(response: &Response) -> Option<FetchOutcome> {
    let status = response.status();
    if status.is_success() {
        return None;
    }
    let outcome = match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            FetchOutcome::Throttled {
                retry_after: response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| parse_retry_after(v, Utc::now())),
            }
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchOutcome::NotFound,
        other => FetchOutcome::Error(format!("unexpected HTTP status {}", other)),
    };
    Some(outcome)
}

/// Parses a `Retry-After` value: delta seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Transport failures (DNS, TLS, timeouts, bodies that fail to decode).
pub fn transport_error(context: &str, err: reqwest::Error) -> FetchOutcome {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_decode() {
        "undecodable body"
    } else {
        "request failed"
    };
    FetchOutcome::Error(format!("{} {}: {}", context, kind, err.without_url()))
}

/// Accepts `2018-12-04` and `20181204`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

/// Strips a trailing slash so paths can be appended with `format!`.
pub fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}
