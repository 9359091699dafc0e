//! Once-only convergence gate.
//!
//! The pipeline writes asynchronously, so scenarios must not query it until
//! every fixture record has reached the API. [`ConvergenceGate::ensure`] waits
//! for that point exactly once: the first caller polls, concurrent callers park
//! on the same cell, and later callers read the cached outcome. A failed
//! outcome is cached too, so every dependent scenario fails fast with the same
//! diagnostic instead of re-polling.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::client::GraphQlClient;
use crate::config::{HarnessConfig, Timing};
use crate::error::{Error, Result};
use crate::liveness::HealthPoller;
use crate::query::{ReportFilter, Selection, StormReportsQuery, TimeRange};

/// Gate parameters.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub api_url: String,
    /// Minimum `totalCount` that counts as converged.
    pub expected_total: usize,
    /// Health, poll and query timings.
    pub timing: Timing,
}

impl GateSettings {
    #[must_use]
    pub fn from_config(config: &HarnessConfig, expected_total: usize) -> Self {
        Self {
            api_url: config.api_url.clone(),
            expected_total,
            timing: config.timing.clone(),
        }
    }
}

/// Terminal gate failure, shared by every caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    /// The query API never became healthy.
    ApiUnhealthy(String),
    /// The HTTP client could not be built.
    Client(String),
    /// The deadline passed below the expected count.
    Timeout {
        last_observed: Option<usize>,
        expected: usize,
        deadline: Duration,
        last_error: Option<String>,
    },
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiUnhealthy(reason) => write!(f, "data did not propagate: {reason}"),
            Self::Client(reason) => write!(f, "data did not propagate: client error: {reason}"),
            Self::Timeout {
                last_observed,
                expected,
                deadline,
                last_error,
            } => {
                write!(
                    f,
                    "data did not propagate within {}s: got {}/{} records",
                    deadline.as_secs(),
                    last_observed.map_or_else(|| "?".to_string(), |n| n.to_string()),
                    expected
                )?;
                if let Some(err) = last_error {
                    write!(f, " (last error: {err})")?;
                }
                Ok(())
            }
        }
    }
}

/// Observable gate lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    Polling,
    Resolved(std::result::Result<usize, GateFailure>),
}

/// Single-assignment convergence gate.
#[derive(Debug)]
pub struct ConvergenceGate {
    settings: GateSettings,
    outcome: OnceCell<std::result::Result<usize, GateFailure>>,
    started: AtomicBool,
    polls: AtomicUsize,
}

impl ConvergenceGate {
    #[must_use]
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            outcome: OnceCell::new(),
            started: AtomicBool::new(false),
            polls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Waits for convergence, returning the observed record count.
    ///
    /// Only the first caller polls. If that caller is cancelled before the
    /// gate resolves, the next caller starts over.
    pub async fn ensure(&self) -> Result<usize> {
        self.outcome
            .get_or_init(|| self.converge())
            .await
            .clone()
            .map_err(Error::NotConverged)
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        match self.outcome.get() {
            Some(outcome) => GateState::Resolved(outcome.clone()),
            None if self.started.load(Ordering::Acquire) => GateState::Polling,
            None => GateState::Uninitialized,
        }
    }

    /// Count queries issued so far.
    #[must_use]
    pub fn polls_issued(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }

    async fn converge(&self) -> std::result::Result<usize, GateFailure> {
        let polling = PollingFlag::raise(&self.started);
        let outcome = self.poll_until_converged().await;
        polling.keep();
        outcome
    }

    async fn poll_until_converged(&self) -> std::result::Result<usize, GateFailure> {
        let settings = &self.settings;
        let timing = &settings.timing;

        // Clients are built here so their connection pools live on the
        // polling caller's runtime.
        HealthPoller::from_timing(timing)
            .wait_healthy("api", &settings.api_url)
            .await
            .map_err(|e| GateFailure::ApiUnhealthy(e.to_string()))?;

        let client = GraphQlClient::new(&settings.api_url, timing.query_timeout())
            .map_err(|e| GateFailure::Client(e.to_string()))?;
        let query = StormReportsQuery::new(
            ReportFilter::new(TimeRange::all_time()),
            Selection::new().total_count(),
        );

        let deadline = Instant::now() + timing.convergence_deadline();
        let mut last_observed = None;
        let mut last_error = None;

        while Instant::now() < deadline {
            self.polls.fetch_add(1, Ordering::Relaxed);
            match client.storm_reports(&query).await {
                Ok(result) => {
                    let count = result.total_count;
                    last_observed = Some(count);
                    if count >= settings.expected_total {
                        info!("data propagated: {count} records found");
                        return Ok(count);
                    }
                    info!(
                        "waiting for data propagation: {count}/{} records",
                        settings.expected_total
                    );
                }
                Err(e) => {
                    warn!(error = %e, "convergence poll failed");
                    last_error = Some(e.to_string());
                }
            }
            sleep(timing.convergence_interval()).await;
        }

        Err(GateFailure::Timeout {
            last_observed,
            expected: settings.expected_total,
            deadline: timing.convergence_deadline(),
            last_error,
        })
    }
}

/// Marks the gate as polling; lowers the mark again if the polling caller
/// is dropped before it resolves the gate.
struct PollingFlag<'a> {
    flag: &'a AtomicBool,
    armed: bool,
}

impl<'a> PollingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PollingFlag<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(false, Ordering::Release);
        }
    }
}

static SHARED_GATE: OnceLock<Arc<ConvergenceGate>> = OnceLock::new();

/// Process-wide gate configured from [`HarnessConfig::load`].
///
/// Initialized on first access and never torn down; its lifetime is the test
/// run.
pub fn shared_gate() -> Result<Arc<ConvergenceGate>> {
    if let Some(gate) = SHARED_GATE.get() {
        return Ok(Arc::clone(gate));
    }
    let config = HarnessConfig::load()?;
    let expected = config.expectations()?.total;
    let gate = SHARED_GATE
        .get_or_init(|| Arc::new(ConvergenceGate::new(GateSettings::from_config(&config, expected))));
    Ok(Arc::clone(gate))
}

/// Waits on the process-wide gate.
pub async fn ensure_data_propagated() -> Result<usize> {
    shared_gate()?.ensure().await
}
