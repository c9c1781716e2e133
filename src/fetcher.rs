//! Listing page download with bounded retry and exponential backoff.
//!
//! The listing page is fetched once per run. Transient failures (timeouts,
//! connection drops, truncated bodies, HTTP 5xx and 429) are retried with
//! exponential backoff and jitter; anything else fails the run immediately.
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! With the defaults (3 attempts, 1s base) the worst case is two sleeps of
//! roughly 1s and 2s on top of three 10s request timeouts.

use rand::{Rng, rng};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Errors that can occur while fetching the listing page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout, body read)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-success status code
    #[error("HTTP error: status {0}")]
    HttpStatus(StatusCode),
    /// Every attempt failed with a transient error; `last` is the final cause
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(e) => {
                e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
            }
            FetchError::HttpStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Exhausted { .. } => false,
        }
    }
}

/// How often and how patiently the fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
    /// Upper bound for a single delay, before jitter.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << exponent).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

/// The raw listing page as returned by the server.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Final URL after redirects.
    pub url: Url,
    /// Response body decoded to text using the declared charset.
    pub body: String,
    /// Charset declared in the `Content-Type` header, if any.
    pub charset: Option<String>,
}

/// Build the HTTP client used for the run.
///
/// The client carries a browser-like `User-Agent` since some blogs serve
/// reduced markup or refuse obvious bots.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, FetchError> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Fetch `url`, retrying transient failures according to `policy`.
///
/// # Errors
///
/// - [`FetchError::HttpStatus`] immediately for non-retryable statuses (e.g. 404)
/// - [`FetchError::Network`] immediately for non-retryable client errors
/// - [`FetchError::Exhausted`] once `policy.max_attempts` transient failures occurred
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch(
    client: &Client,
    url: &Url,
    policy: &RetryPolicy,
) -> Result<RawDocument, FetchError> {
    let total_t0 = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let attempt_t0 = Instant::now();
        match fetch_once(client, url).await {
            Ok(doc) => {
                info!(
                    attempt,
                    bytes = doc.body.len(),
                    charset = ?doc.charset,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    "Fetched listing page"
                );
                return Ok(doc);
            }
            Err(e) if !e.is_retryable() => {
                error!(attempt, error = %e, "Fetch failed with a non-retryable error");
                return Err(e);
            }
            Err(e) => {
                if attempt >= policy.max_attempts {
                    error!(
                        attempt,
                        max = policy.max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        error = %e,
                        "Fetch exhausted retries"
                    );
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }

                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max = policy.max_attempts,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                    ?delay,
                    error = %e,
                    "Fetch attempt failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

async fn fetch_once(client: &Client, url: &Url) -> Result<RawDocument, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status));
    }

    let final_url = response.url().clone();
    let charset = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(declared_charset);
    let body = response.text().await?;

    Ok(RawDocument {
        url: final_url,
        body,
        charset,
    })
}

/// Extract the `charset` parameter from a `Content-Type` header value.
fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_ascii_lowercase())
        } else {
            None
        }
    })
}
