//! Error types for the fixture server.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fixtures::ReportKind;

/// Fixture resolution error types.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// The request path does not name an SPC report file.
    #[error("no route for path: {0}")]
    UnknownPath(String),

    /// No fixture of the requested kind exists in the data directory.
    #[error("fixture not found for type {0}")]
    NotFound(ReportKind),

    /// The data directory could not be turned into a glob pattern.
    #[error("invalid fixture pattern: {0}")]
    Pattern(String),

    /// Reading a fixture file failed.
    #[error("error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fixture could not be parsed as CSV (inventory only).
    #[error("malformed CSV in {path}: {message}")]
    Csv { path: PathBuf, message: String },

    /// A blocking task did not complete.
    #[error("task failed: {0}")]
    Task(String),
}

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;

/// JSON error body returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl FixtureError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownPath(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Pattern(_) | Self::Read { .. } | Self::Csv { .. } | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FixtureError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the server log.
        let message = match &self {
            Self::UnknownPath(_) => "not found".to_string(),
            Self::NotFound(_) => {
                tracing::warn!(error = %self, "fixture lookup failed");
                "fixture not found".to_string()
            }
            _ => {
                tracing::error!(error = %self, "fixture read failed");
                "fixture not found".to_string()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
