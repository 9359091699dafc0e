//! HTTP handlers for the fixture server.
//!
//! - `health`: liveness endpoint
//! - `reports`: SPC report file serving

pub mod health;
pub mod reports;

pub use health::health_check;
pub use reports::serve_report;
