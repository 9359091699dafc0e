//! SPC report file handler.
//!
//! Matches the NOAA URL pattern `/{YYMMDD}_rpts_{type}.csv` and serves the
//! fixture of that type regardless of the requested date.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Uri},
    response::{IntoResponse, Response},
};

use crate::error::FixtureError;
use crate::fixtures::ReportKind;
use crate::normalize::normalize_times;
use crate::AppState;

/// Serve the fixture matching the requested report file name.
pub async fn serve_report(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response, FixtureError> {
    let name = uri.path().strip_prefix('/').unwrap_or(uri.path());
    let kind = ReportKind::from_request_name(name)
        .ok_or_else(|| FixtureError::UnknownPath(uri.path().to_string()))?;

    let store = state.store.clone();
    let fixture = tokio::task::spawn_blocking(move || store.locate(kind))
        .await
        .map_err(|e| FixtureError::Task(e.to_string()))??;

    let data = tokio::fs::read(&fixture.path)
        .await
        .map_err(|source| FixtureError::Read {
            path: fixture.path.clone(),
            source,
        })?;

    // Fixtures are immutable; normalization works on this request's copy.
    let body = match fixture.date {
        Some(date) => normalize_times(&data, date).unwrap_or(data),
        None => data,
    };

    tracing::info!(
        fixture = %fixture.file_name(),
        request = %uri.path(),
        "serving fixture"
    );

    Ok(([(header::CONTENT_TYPE, "text/csv")], body).into_response())
}
