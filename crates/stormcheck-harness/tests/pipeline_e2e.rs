//! Live end-to-end suite against a running pipeline.
//!
//! Requires the collector, ETL and query API to be up and fed by the fixture
//! server. Run with:
//!
//! ```text
//! API_URL=http://localhost:8080 cargo test -p stormcheck-harness --test pipeline_e2e -- --ignored
//! ```
//!
//! Every test shares the process-wide convergence gate, so the suite waits
//! for propagation once no matter how many tests run or in what order.

use stormcheck_harness::{EventType, Harness};

fn live() -> Harness {
    stormcheck_harness::init_test_tracing();
    Harness::from_env().expect("harness configuration")
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn services_healthy() {
    live().services_healthy().await.expect("services healthy");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn data_propagation() {
    live().data_propagation().await.expect("data propagation");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn report_counts() {
    live().report_counts().await.expect("report counts");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn state_aggregations() {
    live().state_aggregations().await.expect("state aggregations");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn report_enrichment() {
    live().report_enrichment().await.expect("report enrichment");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn spot_check_hail_report() {
    live().spot_check().await.expect("spot check");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn hourly_aggregation() {
    live().hourly_aggregation().await.expect("hourly aggregation");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn event_type_filter() {
    live()
        .event_type_filter(EventType::Tornado)
        .await
        .expect("tornado filter");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn meta() {
    live().meta().await.expect("meta");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn pagination() {
    live().pagination().await.expect("pagination");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn severity_filter() {
    live().severity_filter().await.expect("severity filter");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn sort_by_magnitude() {
    live().sort_by_magnitude().await.expect("sort by magnitude");
}

#[tokio::test]
#[ignore = "requires a running pipeline"]
async fn geo_radius_filter() {
    live().geo_radius_filter().await.expect("geo radius filter");
}
