//! Shared HTTP plumbing for rate sources: one client per source and a
//! bounded retry loop around a single JSON GET.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;

use crate::config::HubConfig;
use crate::errors::{redact_url, CoreError};
use crate::models::rates::HistoryMeta;

/// Fixed-attempt, fixed-delay retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Build the client a source keeps for its whole lifetime.
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("valuta-hub/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// GET `url` and decode the body as JSON, retrying on any failure.
///
/// Transport errors, non-2xx statuses and undecodable bodies are all retried
/// up to `policy.max_retries` attempts. The last failure is returned as
/// `CoreError::Api` for `provider`.
pub async fn get_json_with_retry(
    client: &Client,
    provider: &str,
    url: &str,
    query: &[(&str, String)],
    policy: RetryPolicy,
) -> Result<(Value, HistoryMeta), CoreError> {
    let attempts = policy.max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match get_json_once(client, url, query).await {
            Ok(ok) => return Ok(ok),
            Err(e) => {
                last_error = redact_url(&e);
                if attempt < attempts {
                    tracing::debug!(
                        provider,
                        attempt,
                        max = attempts,
                        error = %last_error,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    Err(CoreError::Api {
        provider: provider.to_string(),
        message: format!("request failed after {attempts} attempt(s): {last_error}"),
    })
}

async fn get_json_once(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<(Value, HistoryMeta), String> {
    let started = Instant::now();
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| format!("invalid JSON body: {e}"))?;

    let meta = HistoryMeta {
        request_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        status_code: status.as_u16(),
    };
    Ok((body, meta))
}
