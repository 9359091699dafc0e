//! Bounded liveness polling against `/healthz` endpoints.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::Timing;
use crate::error::{Error, Result};

/// Fixed-interval health poller.
#[derive(Debug, Clone)]
pub struct HealthPoller {
    client: reqwest::Client,
    /// Pause between attempts.
    pub interval: Duration,
    /// Bound on a single request; a hung connection costs at most this.
    pub request_timeout: Duration,
    /// Overall deadline.
    pub timeout: Duration,
}

impl HealthPoller {
    #[must_use]
    pub fn new(interval: Duration, request_timeout: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            interval,
            request_timeout,
            timeout,
        }
    }

    #[must_use]
    pub fn from_timing(timing: &Timing) -> Self {
        Self::new(
            timing.health_interval(),
            timing.health_request_timeout(),
            timing.health_timeout(),
        )
    }

    /// Polls `{base_url}/healthz` until it answers 200 or the deadline passes.
    ///
    /// Non-200 answers and connection errors both mean "not yet healthy".
    pub async fn wait_healthy(&self, name: &str, base_url: &str) -> Result<()> {
        let endpoint = format!("{}/healthz", base_url.trim_end_matches('/'));
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0u32;

        while Instant::now() < deadline {
            attempts += 1;
            match self
                .client
                .get(&endpoint)
                .timeout(self.request_timeout)
                .send()
                .await
            {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    info!(service = name, attempts, "{name} is healthy");
                    return Ok(());
                }
                Ok(resp) => {
                    debug!(service = name, status = %resp.status(), "health check not ready");
                }
                Err(e) => {
                    debug!(service = name, error = %e, "health check failed");
                }
            }
            sleep(self.interval).await;
        }

        Err(Error::Unhealthy {
            name: name.to_string(),
            endpoint,
            timeout: self.timeout,
        })
    }
}

impl Default for HealthPoller {
    fn default() -> Self {
        Self::from_timing(&Timing::default())
    }
}

/// Waits for `{base_url}/healthz` with the default 2s interval, 5s request timeout.
pub async fn wait_healthy(name: &str, base_url: &str, timeout: Duration) -> Result<()> {
    HealthPoller {
        timeout,
        ..HealthPoller::default()
    }
    .wait_healthy(name, base_url)
    .await
}
