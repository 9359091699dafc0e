//! Verification scenarios.
//!
//! Each scenario goes through the convergence gate, queries the fixture day
//! and runs its invariant checks. Scenarios are independent: any of them can
//! run alone, in any order, concurrently with the others.

use std::sync::Arc;

use tracing::info;

use crate::checks::Checks;
use crate::client::GraphQlClient;
use crate::config::{Expectations, HarnessConfig};
use crate::error::Result;
use crate::gate::{shared_gate, ConvergenceGate, GateSettings};
use crate::liveness::HealthPoller;
use crate::model::{EventType, StormReportsResult};
use crate::query::{
    ReportField, ReportFilter, Selection, Severity, SortField, SortOrder, StormReportsQuery,
    TimeRange,
};

/// Page size used by the pagination scenario.
pub const PAGE_SIZE: usize = 5;
/// Number of reports fetched by the sort scenario.
pub const SORT_LIMIT: usize = 10;

/// Scenario context: configuration, a query client and the convergence gate.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    expectations: Expectations,
    client: GraphQlClient,
    health: HealthPoller,
    gate: Arc<ConvergenceGate>,
}

impl Harness {
    /// Build a harness around an injected gate.
    pub fn new(config: HarnessConfig, gate: Arc<ConvergenceGate>) -> Result<Self> {
        let expectations = config.expectations()?;
        let client = GraphQlClient::new(&config.api_url, config.timing.query_timeout())?;
        let health = HealthPoller::from_timing(&config.timing);
        Ok(Self {
            config,
            expectations,
            client,
            health,
            gate,
        })
    }

    /// Build a harness with its own gate.
    pub fn with_private_gate(config: HarnessConfig) -> Result<Self> {
        let expected = config.expectations()?.total;
        let gate = Arc::new(ConvergenceGate::new(GateSettings::from_config(&config, expected)));
        Self::new(config, gate)
    }

    /// Build a harness from the environment, sharing the process-wide gate.
    pub fn from_env() -> Result<Self> {
        Self::new(HarnessConfig::load()?, shared_gate()?)
    }

    #[must_use]
    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }

    #[must_use]
    pub fn gate(&self) -> &ConvergenceGate {
        &self.gate
    }

    #[must_use]
    pub fn client(&self) -> &GraphQlClient {
        &self.client
    }

    fn fixture_day(&self) -> ReportFilter {
        ReportFilter::new(TimeRange::day(self.expectations.fixture_date))
    }

    async fn fetch(&self, filter: ReportFilter, selection: Selection) -> Result<StormReportsResult> {
        self.client
            .storm_reports(&StormReportsQuery::new(filter, selection))
            .await
    }

    /// API, collector and ETL all answer their health endpoints.
    pub async fn services_healthy(&self) -> Result<()> {
        self.health.wait_healthy("api", &self.config.api_url).await?;
        self.health
            .wait_healthy("collector", &self.config.collector_url)
            .await?;
        self.health.wait_healthy("etl", &self.config.etl_url).await
    }

    /// Every expected record reaches the API.
    pub async fn data_propagation(&self) -> Result<()> {
        self.gate.ensure().await.map(|_| ())
    }

    /// Total and per-event-type counts match the fixture set.
    pub async fn report_counts(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(
                self.fixture_day(),
                Selection::new().total_count().by_event_type(),
            )
            .await?;

        let mut checks = Checks::new("report counts");
        checks.equal("totalCount", self.expectations.total, sr.total_count);
        if let Some(aggs) = checks.aggregations(&sr) {
            checks.event_type_counts(aggs, &self.expectations.event_type_counts());
            checks.event_type_sum(sr.total_count, aggs);
        }
        checks.finish()
    }

    /// State and county breakdowns are consistent and match expectations.
    pub async fn state_aggregations(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(self.fixture_day(), Selection::new().total_count().by_state())
            .await?;

        let mut checks = Checks::new("state aggregations");
        if let Some(aggs) = checks.aggregations(&sr) {
            checks.state_county_sums(aggs);
            checks.state_counts(
                aggs,
                self.expectations.state_count,
                &self.expectations.states,
            );
            checks.state_sum(sr.total_count, aggs);
        }
        checks.finish()
    }

    /// Every report carries the ETL enrichment fields.
    pub async fn report_enrichment(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(
                self.fixture_day(),
                Selection::new().reports(ReportField::ENRICHMENT),
            )
            .await?;

        let mut checks = Checks::new("report enrichment");
        checks.enrichment(&sr.reports);
        checks.finish()
    }

    /// A known report resolves to the expected place and office.
    ///
    /// Passes trivially when no spot check is configured.
    pub async fn spot_check(&self) -> Result<()> {
        let Some(expected) = &self.expectations.spot_check else {
            info!("no spot check configured");
            return Ok(());
        };
        self.gate.ensure().await?;

        let filter = self
            .fixture_day()
            .event_types([expected.event_type])
            .counties([expected.county.clone()]);
        let sr = self
            .fetch(
                filter,
                Selection::new().total_count().reports([
                    ReportField::EventType,
                    ReportField::Measurement,
                    ReportField::Provenance,
                    ReportField::Location,
                ]),
            )
            .await?;

        let mut checks = Checks::new("spot check");
        if sr.total_count < 1 {
            checks.fail(
                format!("{} {} totalCount", expected.county, expected.event_type),
                "at least 1",
                "0",
            );
        }
        checks.spot_check(&sr.reports, expected);
        checks.finish()
    }

    /// Hour buckets partition the fixture day.
    pub async fn hourly_aggregation(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(self.fixture_day(), Selection::new().total_count().by_hour())
            .await?;

        let mut checks = Checks::new("hourly aggregation");
        if let Some(aggs) = checks.aggregations(&sr) {
            checks.hour_sum(sr.total_count, aggs);
        }
        checks.finish()
    }

    /// A single-type filter returns only that type, and all of it.
    pub async fn event_type_filter(&self, event_type: EventType) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(
                self.fixture_day().event_types([event_type]),
                Selection::new()
                    .total_count()
                    .reports([ReportField::Id, ReportField::EventType]),
            )
            .await?;

        let mut checks = Checks::new(format!("{event_type} filter"));
        checks.equal(
            format!("{event_type} filter totalCount"),
            self.expectations.count_for(event_type),
            sr.total_count,
        );
        checks.event_type_filter(&sr.reports, event_type);
        checks.finish()
    }

    /// Freshness metadata is populated after convergence.
    pub async fn meta(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self.fetch(self.fixture_day(), Selection::new().meta()).await?;

        let mut checks = Checks::new("meta");
        checks.meta_present(sr.meta.as_ref());
        checks.finish()
    }

    /// Consecutive pages are disjoint and correctly sized.
    pub async fn pagination(&self) -> Result<()> {
        self.gate.ensure().await?;
        let selection = Selection::new()
            .total_count()
            .has_more()
            .reports([ReportField::Id]);
        let page1 = self
            .fetch(self.fixture_day().page(PAGE_SIZE, 0), selection.clone())
            .await?;
        let page2 = self
            .fetch(self.fixture_day().page(PAGE_SIZE, PAGE_SIZE), selection)
            .await?;

        let mut checks = Checks::new("pagination");
        checks.equal("page 1 totalCount", self.expectations.total, page1.total_count);
        checks.pages_disjoint(&page1, &page2, PAGE_SIZE);
        checks.finish()
    }

    /// A severity filter narrows results to that severity.
    pub async fn severity_filter(&self) -> Result<()> {
        self.gate.ensure().await?;
        let severity = Severity::Severe;
        let sr = self
            .fetch(
                self.fixture_day().severity([severity]),
                Selection::new()
                    .total_count()
                    .reports([ReportField::Id, ReportField::Measurement]),
            )
            .await?;

        let mut checks = Checks::new("severity filter");
        checks.narrows("severity filter", sr.total_count, self.expectations.total);
        checks.severity_filter(&sr.reports, severity);
        checks.finish()
    }

    /// Hail sorted by magnitude descending is non-increasing.
    pub async fn sort_by_magnitude(&self) -> Result<()> {
        self.gate.ensure().await?;
        let sr = self
            .fetch(
                self.fixture_day()
                    .event_types([EventType::Hail])
                    .sort(SortField::Magnitude, SortOrder::Desc)
                    .limit(SORT_LIMIT),
                Selection::new().reports([ReportField::Id, ReportField::Measurement]),
            )
            .await?;

        let mut checks = Checks::new("sort by magnitude");
        checks.sorted_desc_by_magnitude(&sr.reports);
        checks.finish()
    }

    /// A radius filter returns only nearby reports, and not all of them.
    pub async fn geo_radius_filter(&self) -> Result<()> {
        self.gate.ensure().await?;
        let center = &self.expectations.geo_probe;
        let sr = self
            .fetch(
                self.fixture_day()
                    .near(center.lat, center.lon, center.radius_miles),
                Selection::new()
                    .total_count()
                    .reports([ReportField::Id, ReportField::Geo]),
            )
            .await?;

        let mut checks = Checks::new("geo radius filter");
        checks.narrows("geo filter", sr.total_count, self.expectations.total);
        checks.within_radius(
            &sr.reports,
            center.lat,
            center.lon,
            center.radius_miles + center.tolerance_miles,
        );
        checks.finish()
    }
}
