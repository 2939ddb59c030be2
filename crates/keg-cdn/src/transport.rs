//! HTTP transport to a CDN host: URL construction and retry/backoff.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::CdnError;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_JITTER_FACTOR: f64 = 0.1;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// HTTP transport over a CDN host, with exponential backoff retry for
/// transient failures (connect/timeout errors, 429, 5xx).
#[derive(Debug, Clone)]
pub struct CdnTransport {
    client: Client,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl CdnTransport {
    /// Build a transport with the defaults the upstream CDN client uses:
    /// 3 retries, 100ms initial backoff doubling to a 10s cap, plus jitter.
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(20)
            .build()?;
        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        })
    }

    /// Exponential backoff with jitter for retry attempt number `attempt`
    /// (0-based).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff_ms as f64);
        let jitter_range = capped * self.jitter_factor;
        let jitter = rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    /// GET `url`, retrying transient failures with backoff.
    ///
    /// 4xx (other than a 429) fails immediately without retry; the caller
    /// is expected to translate a non-success status into the appropriate
    /// taxonomy error (`NotFound` for 404, `NetworkError` otherwise).
    pub async fn get(&self, url: &str) -> Result<Response, CdnError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.calculate_backoff(attempt - 1);
                debug!(url, attempt, ?backoff, "retrying CDN request");
                sleep(backoff).await;
            }

            trace!(url, attempt, "CDN request");
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        warn!(url, attempt, "rate limited, will retry");
                        last_error = Some(CdnError::HttpStatus {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                        continue;
                    }
                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(url, attempt, %status, "server error, will retry");
                        last_error = Some(CdnError::HttpStatus {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                        continue;
                    }
                    return Err(CdnError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(e) => {
                    let retryable = e.is_connect() || e.is_timeout() || e.is_request();
                    if retryable && attempt < self.max_retries {
                        warn!(url, attempt, error = %e, "request failed, will retry");
                        last_error = Some(CdnError::Network {
                            url: url.to_string(),
                            source: e,
                        });
                    } else {
                        return Err(CdnError::Network {
                            url: url.to_string(),
                            source: e,
                        });
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CdnError::HttpStatus {
            url: url.to_string(),
            status: 0,
        }))
    }

    /// Build a CDN object URL: `http://{host}/{path}/{hash[0:2]}/{hash[2:4]}/{hash}`.
    pub fn build_url(host: &str, path: &str, hash: &str) -> Result<String, CdnError> {
        if hash.len() < 4 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CdnError::Malformed {
                what: "content key".to_string(),
                reason: format!("not valid hex: {hash}"),
            });
        }
        Ok(format!(
            "http://{}/{}/{}/{}/{}",
            host,
            path.trim_matches('/'),
            &hash[..2],
            &hash[2..4],
            hash
        ))
    }
}
