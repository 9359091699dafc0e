//! Error types for stormcheck-harness.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::checks::Violation;
use crate::gate::GateFailure;
use crate::model::GraphQlError;

/// Harness error types.
///
/// Every variant is terminal for the scenario that observes it; transient
/// conditions are absorbed by poll intervals before they reach this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Fixture inventory failed while deriving expectations.
    #[error("Fixture error: {0}")]
    Fixture(#[from] stormcheck_fixtures::FixtureError),

    /// Transport-level failure: connection refused, DNS, timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 response from the query API.
    #[error("GraphQL returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response envelope was not valid JSON for the expected shape.
    #[error("unmarshaling GraphQL response: {source}\nbody: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The envelope carried a non-empty `errors` array.
    #[error("GraphQL errors: {}", DisplayList(.0))]
    GraphQl(Vec<GraphQlError>),

    /// The envelope had neither errors nor data.
    #[error("GraphQL response has no data")]
    MissingData,

    /// A service never answered its health endpoint with 200.
    #[error("{name} did not become healthy within {}s (endpoint: {endpoint})", .timeout.as_secs())]
    Unhealthy {
        name: String,
        endpoint: String,
        timeout: Duration,
    },

    /// The convergence gate resolved to failure.
    #[error("{0}")]
    NotConverged(GateFailure),

    /// One or more invariant checks failed.
    #[error("{scenario}: {} invariant violation(s):\n{}", .violations.len(), DisplayList(.violations))]
    Invariants {
        scenario: String,
        violations: Vec<Violation>,
    },
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

struct DisplayList<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for DisplayList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "  - {item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhealthy_display() {
        let err = Error::Unhealthy {
            name: "api".to_string(),
            endpoint: "http://localhost:8080/healthz".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "api did not become healthy within 60s (endpoint: http://localhost:8080/healthz)"
        );
    }

    #[test]
    fn test_graphql_errors_display_every_message() {
        let err = Error::GraphQl(vec![
            GraphQlError::new("unknown field foo"),
            GraphQlError::new("bad filter"),
        ]);
        let text = err.to_string();
        assert!(text.contains("unknown field foo"));
        assert!(text.contains("bad filter"));
    }

    #[test]
    fn test_invariants_display_lists_violations() {
        let err = Error::Invariants {
            scenario: "report counts".to_string(),
            violations: vec![
                Violation::new("totalCount", "271", "270"),
                Violation::new("hail count", "79", "78"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("report counts: 2 invariant violation(s)"));
        assert!(text.contains("totalCount = 270, want 271"));
        assert!(text.contains("hail count = 78, want 79"));
    }
}
