//! # stormcheck fixtures
//!
//! Deterministic stand-in for the NOAA SPC daily storm report feed.
//!
//! The server answers `GET /{YYMMDD}_rpts_{torn|hail|wind}.csv` with the
//! fixture of that report type found in a data directory, whatever date was
//! requested. When the fixture name carries a valid `YYMMDD` prefix, the
//! `Time` column is expanded from `HHMM` to ISO 8601 on that date so the
//! collector ingests correct historical timestamps.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stormcheck_fixtures::{build_router, AppState, FixtureStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let state = Arc::new(AppState {
//!     store: FixtureStore::new("./fixtures"),
//! });
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod fixtures;
pub mod handlers;
pub mod normalize;

pub use error::{ErrorResponse, FixtureError, Result};
pub use fixtures::{fixture_date, Fixture, FixtureStore, FixtureSummary, ReportKind};
pub use handlers::{health_check, serve_report};
pub use normalize::{expand_hhmm, normalize_times};

/// Upper bound on the time spent serving a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared server state.
#[derive(Debug)]
pub struct AppState {
    pub store: FixtureStore,
}

/// Build the fixture server router.
///
/// `/healthz` is the only fixed route; every other path goes to
/// [`serve_report`], which answers 404 for names it does not recognize.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .fallback(serve_report)
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}
