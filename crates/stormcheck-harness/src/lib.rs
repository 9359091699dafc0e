//! # stormcheck harness
//!
//! End-to-end verification for the storm report pipeline: wait for the
//! services to come up, wait once for every fixture record to reach the query
//! API, then assert invariants on what the API returns.
//!
//! ```rust,no_run
//! use stormcheck_harness::Harness;
//!
//! # async fn run() -> stormcheck_harness::Result<()> {
//! let harness = Harness::from_env()?;
//! harness.services_healthy().await?;
//! harness.report_counts().await?;
//! harness.geo_radius_filter().await?;
//! # Ok(())
//! # }
//! ```

pub mod checks;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod geo;
pub mod liveness;
pub mod model;
pub mod query;
pub mod scenarios;

pub use checks::{Checks, Violation};
pub use client::GraphQlClient;
pub use config::{Expectations, GeoProbe, HarnessConfig, SpotCheck, Timing};
pub use error::{Error, Result};
pub use gate::{
    ensure_data_propagated, shared_gate, ConvergenceGate, GateFailure, GateSettings, GateState,
};
pub use geo::haversine_miles;
pub use liveness::{wait_healthy, HealthPoller};
pub use model::{EventType, StormReport, StormReportsResult};
pub use query::{ReportFilter, Selection, Severity, SortField, SortOrder, StormReportsQuery, TimeRange};
pub use scenarios::Harness;

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`. Safe to call from every test;
/// only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}
