//! HTTP client for the cache service lookup endpoint

use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Header the cache service sets on every event response
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Hit,
    Miss,
    /// 2xx without a recognised cache status
    Unknown,
    /// Non-2xx response
    HttpError(u16),
    Timeout,
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub kind: OutcomeKind,
    pub latency: Duration,
}

impl QueryOutcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            OutcomeKind::HttpError(_) | OutcomeKind::Timeout | OutcomeKind::Transport(_)
        )
    }
}

pub struct CacheServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl CacheServiceClient {
    /// `base_url` is the lookup route prefix, e.g. `http://localhost:3001/event`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Request one event and classify the answer. Never fails.
    pub async fn query(&self, event_id: &str) -> QueryOutcome {
        let url = format!("{}/{}", self.base_url, event_id);
        let started = Instant::now();
        let response = self.http.get(&url).send().await;
        let latency = started.elapsed();

        let kind = match response {
            Ok(response) if response.status().is_success() => {
                match response
                    .headers()
                    .get(CACHE_STATUS_HEADER)
                    .and_then(|v| v.to_str().ok())
                {
                    Some("HIT") => OutcomeKind::Hit,
                    Some("MISS") => OutcomeKind::Miss,
                    _ => OutcomeKind::Unknown,
                }
            }
            Ok(response) => {
                let status = response.status();
                warn!(
                    "Query for {} failed: {} in {:.2}ms",
                    event_id,
                    status,
                    latency.as_secs_f64() * 1000.0
                );
                OutcomeKind::HttpError(status.as_u16())
            }
            Err(e) if e.is_timeout() => {
                warn!("Timeout querying {}", event_id);
                OutcomeKind::Timeout
            }
            Err(e) => {
                warn!("Network error querying {}: {}", event_id, e);
                OutcomeKind::Transport(e.to_string())
            }
        };

        debug!(
            "GET {} -> {:?} in {:.2}ms",
            event_id,
            kind,
            latency.as_secs_f64() * 1000.0
        );
        QueryOutcome { kind, latency }
    }
}
