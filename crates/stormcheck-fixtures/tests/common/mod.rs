//! Shared helpers for fixture server integration tests.

#![allow(dead_code)]

use axum::Router;
use std::sync::Arc;
use stormcheck_fixtures::{build_router, AppState, FixtureStore};
use tempfile::TempDir;

/// Hail fixture excerpt in SPC column order.
pub const HAIL_CSV: &str = "Time,Size,Location,County,State,Lat,Lon,Comments\n\
1510,125,3 ESE Chappel,San Saba,TX,31.04,-98.53,(SJT)\n\
2105,100,Elba,Howard,NE,41.28,-98.57,(GID)\n";

/// Tornado fixture excerpt.
pub const TORN_CSV: &str = "Time,F_Scale,Location,County,State,Lat,Lon,Comments\n\
1841,UNK,2 N Elkhorn,Douglas,NE,41.31,-96.24,(OAX)\n";

/// Build a router over `temp_dir`.
pub fn create_test_app(temp_dir: &TempDir) -> Router {
    build_router(Arc::new(AppState {
        store: FixtureStore::new(temp_dir.path()),
    }))
}

/// Write a fixture file into `temp_dir`.
pub fn write_fixture(temp_dir: &TempDir, name: &str, contents: &str) {
    std::fs::write(temp_dir.path().join(name), contents).expect("Failed to write fixture");
}
