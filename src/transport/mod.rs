//! Authenticated transport with bounded retry.
//!
//! One [`Transport::call`] performs a single logical request: it attaches
//! the credential, issues a GET (no body) or POST (JSON body), classifies
//! the response, and retries transient failures with either the server's
//! `Retry-After` advice or exponential backoff.

use crate::auth::CredentialProvider;
use crate::config::{ConnectionConfig, RetryConfig};
use crate::errors::{retryable_status, DirectoryError, DirectoryResult};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;

/// Performs authenticated HTTP calls against the service endpoint.
pub struct Transport {
    http: reqwest::Client,
    endpoint: String,
    user_agent: String,
    retry: RetryConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl Transport {
    /// Creates a transport for the configured endpoint.
    pub fn new(
        config: &ConnectionConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> DirectoryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                DirectoryError::argument(format!("failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            user_agent: config.user_agent_string(),
            retry: config.retry.clone(),
            credentials,
        })
    }

    /// Makes a single call with retry on temporary failure.
    ///
    /// `path` is appended to the endpoint and must carry its own leading
    /// slash and any query string. A body makes the call a POST.
    pub async fn call(&self, path: &str, body: Option<&Value>) -> DirectoryResult<Value> {
        let url = format!("{}{}", self.endpoint, path);
        let mut waited = Duration::ZERO;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if self.credentials.is_expired().await {
                self.credentials.refresh().await?;
            }
            let authorization = self.credentials.authorization().await?;
            let request = match body {
                Some(b) => self.http.post(&url).json(b),
                None => self.http.get(&url),
            }
            .header(AUTHORIZATION, authorization.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "application/json");

            let wait = match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match status {
                        200 | 201 => {
                            return response.json::<Value>().await.map_err(|e| {
                                DirectoryError::client(format!(
                                    "failed to parse response body: {}",
                                    e
                                ))
                            });
                        }
                        204 => return Ok(Value::Null),
                        s if retryable_status(s) => {
                            let advice = response
                                .headers()
                                .get(RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_owned);
                            tracing::warn!(
                                status = s,
                                attempt,
                                "service unavailable (code {} on try {})",
                                s,
                                attempt
                            );
                            retry_wait(attempt, advice.as_deref(), &self.retry)
                        }
                        s @ 400..=499 => {
                            let text = response.text().await.unwrap_or_default();
                            return Err(DirectoryError::Request {
                                status: s,
                                body: text,
                            });
                        }
                        s => {
                            let text = response.text().await.unwrap_or_default();
                            return Err(DirectoryError::Server {
                                status: s,
                                body: text,
                            });
                        }
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    tracing::warn!(error = %e, attempt, "network failure, treating as retryable");
                    retry_wait(attempt, None, &self.retry)
                }
                Err(e) => {
                    return Err(DirectoryError::client(format!("request failed: {}", e)));
                }
            };

            if attempt >= self.retry.max_attempts {
                tracing::error!(
                    attempts = attempt,
                    waited_secs = waited.as_secs(),
                    "giving up after {} attempts ({} seconds)",
                    attempt,
                    waited.as_secs()
                );
                return Err(DirectoryError::Unavailable {
                    attempts: attempt,
                    waited,
                });
            }
            tracing::warn!(wait_secs = wait.as_secs(), "next retry in {} seconds", wait.as_secs());
            sleep(wait).await;
            waited += wait;
        }
    }
}

/// Computes the wait before the next retry: server `Retry-After` advice
/// (delta-seconds or HTTP-date) when present and positive, exponential
/// backoff otherwise.
pub(crate) fn retry_wait(attempt: u32, retry_after: Option<&str>, retry: &RetryConfig) -> Duration {
    if let Some(value) = retry_after.map(str::trim) {
        if let Ok(date) = DateTime::parse_from_rfc2822(value) {
            let delta = date.with_timezone(&Utc) - Utc::now();
            let secs = delta.num_seconds();
            if secs > 0 {
                return Duration::from_secs(secs as u64);
            }
        } else if let Ok(secs) = value.parse::<i64>() {
            if secs > 0 {
                return Duration::from_secs(secs as u64);
            }
        }
        // Advice absent, unparseable, or non-positive falls through to backoff.
    }
    backoff(attempt, retry)
}

/// Exponential backoff: `2^(attempt-1) * first_delay + random(0, jitter_max)`.
fn backoff(attempt: u32, retry: &RetryConfig) -> Duration {
    // Exponent cap keeps the multiply in range for any attempt count.
    let exponent = attempt.saturating_sub(1).min(16);
    retry.first_delay * 2u32.pow(exponent) + Duration::from_secs(jitter(retry.jitter_max))
}

fn jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % (max + 1)
}
