//! Invariant checks over decoded `stormReports` results.
//!
//! A [`Checks`] value collects every violation found in one scenario. Checks
//! never short-circuit each other: each records what it finds and
//! [`Checks::finish`] reports all of them at once.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::config::SpotCheck;
use crate::error::{Error, Result};
use crate::geo::haversine_miles;
use crate::model::{EventType, QueryMeta, StormAggregations, StormReport, StormReportsResult};
use crate::query::Severity;

/// A single failed expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub subject: String,
    pub expected: String,
    pub actual: String,
}

impl Violation {
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}, want {}", self.subject, self.actual, self.expected)
    }
}

/// Violation accumulator for one scenario.
#[derive(Debug)]
pub struct Checks {
    scenario: String,
    violations: Vec<Violation>,
}

impl Checks {
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Records a violation unconditionally.
    pub fn fail(
        &mut self,
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) {
        self.violations.push(Violation::new(subject, expected, actual));
    }

    pub fn equal<T: PartialEq + fmt::Display>(&mut self, subject: impl Into<String>, expected: T, actual: T) {
        if expected != actual {
            self.fail(subject, expected.to_string(), actual.to_string());
        }
    }

    /// Fails with every recorded violation, or returns `Ok` when none.
    pub fn finish(self) -> Result<()> {
        if self.violations.is_empty() {
            return Ok(());
        }
        for violation in &self.violations {
            tracing::error!(scenario = %self.scenario, "{violation}");
        }
        Err(Error::Invariants {
            scenario: self.scenario,
            violations: self.violations,
        })
    }

    /// `aggregations` must be present. Returns it for further checks.
    pub fn aggregations<'a>(&mut self, result: &'a StormReportsResult) -> Option<&'a StormAggregations> {
        if result.aggregations.is_none() {
            self.fail("aggregations", "non-null", "null");
        }
        result.aggregations.as_ref()
    }

    /// Sum of `byEventType` counts equals `total`.
    pub fn event_type_sum(&mut self, total: usize, aggs: &StormAggregations) {
        let sum: usize = aggs.by_event_type.iter().map(|g| g.count).sum();
        self.equal("sum of byEventType counts", total, sum);
    }

    /// At least one hour bucket, no empty labels, and the counts sum to `total`.
    pub fn hour_sum(&mut self, total: usize, aggs: &StormAggregations) {
        if aggs.by_hour.is_empty() {
            self.fail("byHour buckets", "at least one", "none");
        }
        for group in &aggs.by_hour {
            if group.bucket.is_empty() {
                self.fail("hourly bucket timestamp", "non-empty", "empty");
            }
        }
        let sum: usize = aggs.by_hour.iter().map(|g| g.count).sum();
        self.equal("hourly bucket total", total, sum);
    }

    /// Every state has a county breakdown summing to the state count.
    pub fn state_county_sums(&mut self, aggs: &StormAggregations) {
        for state in &aggs.by_state {
            if state.counties.is_empty() {
                self.fail(
                    format!("state {} county breakdown", state.state),
                    "non-empty",
                    "empty",
                );
                continue;
            }
            let sum: usize = state.counties.iter().map(|c| c.count).sum();
            self.equal(format!("state {} county total", state.state), state.count, sum);
        }
    }

    /// Sum of `byState` counts equals `total`.
    pub fn state_sum(&mut self, total: usize, aggs: &StormAggregations) {
        let sum: usize = aggs.by_state.iter().map(|s| s.count).sum();
        self.equal("sum of byState counts", total, sum);
    }

    /// Per-event-type counts match `expected`; missing groups count as zero.
    pub fn event_type_counts(&mut self, aggs: &StormAggregations, expected: &BTreeMap<EventType, usize>) {
        let actual: BTreeMap<&str, usize> = aggs
            .by_event_type
            .iter()
            .map(|g| (g.event_type.as_str(), g.count))
            .collect();
        for (event_type, want) in expected {
            let got = actual.get(event_type.as_str()).copied().unwrap_or(0);
            self.equal(format!("{event_type} count"), *want, got);
        }
    }

    /// Distinct state count and named per-state counts.
    pub fn state_counts(
        &mut self,
        aggs: &StormAggregations,
        expected_states: usize,
        expected_counts: &BTreeMap<String, usize>,
    ) {
        let actual: BTreeMap<&str, usize> = aggs
            .by_state
            .iter()
            .map(|s| (s.state.as_str(), s.count))
            .collect();
        self.equal("distinct states", expected_states, actual.len());
        for (state, want) in expected_counts {
            let got = actual.get(state.as_str()).copied().unwrap_or(0);
            self.equal(format!("{state} count"), *want, got);
        }
    }

    /// Every report carries the filtered event type.
    pub fn event_type_filter(&mut self, reports: &[StormReport], event_type: EventType) {
        for report in reports {
            if report.kind() != Some(event_type) {
                self.fail(
                    format!("filtered report {} eventType", report.id),
                    event_type.as_str(),
                    report.event_type.as_deref().unwrap_or("<nil>"),
                );
            }
        }
    }

    /// Every report carries the filtered severity.
    pub fn severity_filter(&mut self, reports: &[StormReport], severity: Severity) {
        for report in reports {
            let actual = report.measurement.severity.as_deref();
            if actual != Some(severity.as_str()) {
                self.fail(
                    format!("filtered report {} severity", report.id),
                    severity.as_str(),
                    actual.unwrap_or("<nil>"),
                );
            }
        }
    }

    /// A filter must select something, but not everything.
    pub fn narrows(&mut self, subject: &str, filtered: usize, unfiltered: usize) {
        if filtered == 0 {
            self.fail(format!("{subject} totalCount"), "at least 1", "0");
        }
        if filtered >= unfiltered {
            self.fail(
                format!("{subject} totalCount"),
                format!("fewer than {unfiltered}"),
                filtered.to_string(),
            );
        }
    }

    /// ETL enrichment fields are populated on every report.
    pub fn enrichment(&mut self, reports: &[StormReport]) {
        if reports.is_empty() {
            self.fail("reports", "at least one", "none");
        }
        for r in reports {
            if r.id.is_empty() {
                self.fail("report id", "non-empty", "empty");
            }
            let required = [
                ("measurement.unit", &r.measurement.unit),
                ("timeBucket", &r.time_bucket),
                ("processedAt", &r.processed_at),
                ("state", &r.location.state),
                ("county", &r.location.county),
            ];
            for (field, value) in required {
                if value.is_empty() {
                    self.fail(format!("report {} {field}", r.id), "non-empty", "empty");
                }
            }
            if r.geo.lat == 0.0 && r.geo.lon == 0.0 {
                self.fail(format!("report {} geo", r.id), "non-zero coordinates", "(0, 0)");
            }
        }
    }

    /// Magnitudes are non-increasing.
    pub fn sorted_desc_by_magnitude(&mut self, reports: &[StormReport]) {
        if reports.len() < 2 {
            self.fail("sorted reports", "at least 2", reports.len().to_string());
        }
        for (i, pair) in reports.windows(2).enumerate() {
            let prev = pair[0].measurement.magnitude;
            let curr = pair[1].measurement.magnitude;
            if prev < curr {
                self.fail(
                    format!("magnitude order at index {i}"),
                    format!("{prev:.2} >= index {} ({curr:.2})", i + 1),
                    format!("{prev:.2} < {curr:.2}"),
                );
            }
        }
    }

    /// Every report lies within `max_miles` of the center.
    pub fn within_radius(&mut self, reports: &[StormReport], lat: f64, lon: f64, max_miles: f64) {
        for r in reports {
            let dist = haversine_miles(lat, lon, r.geo.lat, r.geo.lon);
            if dist > max_miles {
                self.fail(
                    format!("distance of report at ({:.4}, {:.4})", r.geo.lat, r.geo.lon),
                    format!("<= {max_miles:.1} miles"),
                    format!("{dist:.1} miles"),
                );
            }
        }
    }

    /// Two consecutive pages have the requested size and no shared ids.
    pub fn pages_disjoint(&mut self, page1: &StormReportsResult, page2: &StormReportsResult, limit: usize) {
        if !page1.has_more {
            self.fail("page 1 hasMore", "true", "false");
        }
        self.equal("page 1 reports", limit, page1.reports.len());
        self.equal("page 2 reports", limit, page2.reports.len());

        let ids: HashSet<&str> = page1.reports.iter().map(|r| r.id.as_str()).collect();
        for r in &page2.reports {
            if ids.contains(r.id.as_str()) {
                self.fail("page 2 duplicate id", "absent from page 1", r.id.clone());
            }
        }
    }

    /// Freshness metadata is populated.
    pub fn meta_present(&mut self, meta: Option<&QueryMeta>) {
        let Some(meta) = meta else {
            self.fail("meta", "non-null", "null");
            return;
        };
        if meta.last_updated.is_none() {
            self.fail("meta.lastUpdated", "non-null", "null");
        }
        if meta.data_lag_minutes.is_none() {
            self.fail("meta.dataLagMinutes", "non-null", "null");
        }
    }

    /// A report with the expected magnitude exists and matches `expected`.
    pub fn spot_check(&mut self, reports: &[StormReport], expected: &SpotCheck) {
        let Some(r) = reports
            .iter()
            .find(|r| (r.measurement.magnitude - expected.magnitude).abs() < f64::EPSILON)
        else {
            self.fail(
                format!("{} {} report", expected.county, expected.event_type),
                format!("magnitude {}", expected.magnitude),
                "no match",
            );
            return;
        };

        self.equal(
            "eventType",
            expected.event_type.as_str(),
            r.kind().map_or_else(
                || r.event_type.as_deref().unwrap_or("<nil>"),
                |k| k.as_str(),
            ),
        );
        self.equal("measurement.unit", expected.unit.as_str(), r.measurement.unit.as_str());
        self.equal("sourceOffice", expected.source_office.as_str(), r.source_office.as_str());
        self.equal("location.name", expected.name.as_str(), r.location.name.as_str());
        self.equal("location.state", expected.state.as_str(), r.location.state.as_str());
        // Direction is nullable; only a present value must match.
        if let (Some(want), Some(got)) = (&expected.direction, &r.location.direction) {
            self.equal("location.direction", want.as_str(), got.as_str());
        }
    }
}
