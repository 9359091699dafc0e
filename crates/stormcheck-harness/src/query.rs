//! Structured builder for `stormReports` queries.
//!
//! A [`StormReportsQuery`] pairs a typed [`ReportFilter`] with a
//! [`Selection`] and renders the GraphQL document sent on the wire:
//!
//! ```text
//! { stormReports(filter: { timeRange: { from: "..." to: "..." } eventTypes: [HAIL] limit: 5 }) { totalCount reports { id } } }
//! ```
//!
//! String arguments are escaped as JSON string literals, which are valid
//! GraphQL strings; enum arguments render as bare identifiers.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::model::EventType;

/// Half-open time window on report begin time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    #[must_use]
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Midnight-to-midnight UTC window covering `date`.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        let from = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
        Self {
            from,
            to: from + chrono::Duration::days(1),
        }
    }

    /// The wide 2020..2030 window used to count every ingested record.
    #[must_use]
    pub fn all_time() -> Self {
        Self {
            from: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            to: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

/// Severity classification filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    /// Lowercase name as returned in `measurement.severity`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Extreme => "extreme",
        }
    }

    #[must_use]
    pub fn graphql_value(self) -> &'static str {
        match self {
            Self::Minor => "MINOR",
            Self::Moderate => "MODERATE",
            Self::Severe => "SEVERE",
            Self::Extreme => "EXTREME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    BeginTime,
    Magnitude,
}

impl SortField {
    #[must_use]
    pub fn graphql_value(self) -> &'static str {
        match self {
            Self::BeginTime => "BEGIN_TIME",
            Self::Magnitude => "MAGNITUDE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn graphql_value(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Radius filter around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Near {
    pub lat: f64,
    pub lon: f64,
    pub radius_miles: f64,
}

/// Filter argument of `stormReports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFilter {
    pub time_range: TimeRange,
    pub event_types: Vec<EventType>,
    pub counties: Vec<String>,
    pub severity: Vec<Severity>,
    pub near: Option<Near>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReportFilter {
    #[must_use]
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            event_types: Vec::new(),
            counties: Vec::new(),
            severity: Vec::new(),
            near: None,
            sort_by: None,
            sort_order: None,
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    #[must_use]
    pub fn counties<S: Into<String>>(mut self, counties: impl IntoIterator<Item = S>) -> Self {
        self.counties = counties.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn severity(mut self, severity: impl IntoIterator<Item = Severity>) -> Self {
        self.severity = severity.into_iter().collect();
        self
    }

    #[must_use]
    pub fn near(mut self, lat: f64, lon: f64, radius_miles: f64) -> Self {
        self.near = Some(Near {
            lat,
            lon,
            radius_miles,
        });
        self
    }

    #[must_use]
    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }

    #[must_use]
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn render(&self, out: &mut String) {
        out.push_str("filter: { timeRange: { from: ");
        push_string(out, &rfc3339(self.time_range.from));
        out.push_str(" to: ");
        push_string(out, &rfc3339(self.time_range.to));
        out.push_str(" }");

        if !self.event_types.is_empty() {
            out.push_str(" eventTypes: ");
            push_enum_list(out, self.event_types.iter().map(|t| t.graphql_value()));
        }
        if !self.counties.is_empty() {
            out.push_str(" counties: [");
            for (i, county) in self.counties.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_string(out, county);
            }
            out.push(']');
        }
        if !self.severity.is_empty() {
            out.push_str(" severity: ");
            push_enum_list(out, self.severity.iter().map(|s| s.graphql_value()));
        }
        if let Some(near) = self.near {
            let _ = write!(
                out,
                " near: {{ lat: {:?}, lon: {:?}, radiusMiles: {:?} }}",
                near.lat, near.lon, near.radius_miles
            );
        }
        if let Some(field) = self.sort_by {
            let _ = write!(out, " sortBy: {}", field.graphql_value());
        }
        if let Some(order) = self.sort_order {
            let _ = write!(out, " sortOrder: {}", order.graphql_value());
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, " limit: {limit}");
        }
        if let Some(offset) = self.offset {
            let _ = write!(out, " offset: {offset}");
        }
        out.push_str(" }");
    }
}

/// Report sub-selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    Id,
    EventType,
    Geo,
    Measurement,
    Times,
    Provenance,
    Location,
    Comments,
    Enrichment,
    Geocoding,
}

impl ReportField {
    /// Fields checked for enrichment completeness.
    pub const ENRICHMENT: [ReportField; 6] = [
        ReportField::Id,
        ReportField::EventType,
        ReportField::Measurement,
        ReportField::Provenance,
        ReportField::Enrichment,
        ReportField::Location,
    ];

    fn selection(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::EventType => "eventType",
            Self::Geo => "geo { lat lon }",
            Self::Measurement => "measurement { magnitude unit severity }",
            Self::Times => "beginTime endTime",
            Self::Provenance => "source sourceOffice",
            Self::Location => "location { raw name state county direction distance }",
            Self::Comments => "comments",
            Self::Enrichment => "timeBucket processedAt geo { lat lon }",
            Self::Geocoding => "geocoding { formattedAddress placeName confidence source }",
        }
    }
}

/// Selection set of `stormReports`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    total_count: bool,
    has_more: bool,
    reports: Vec<ReportField>,
    by_event_type: bool,
    by_state: bool,
    by_hour: bool,
    meta: bool,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn total_count(mut self) -> Self {
        self.total_count = true;
        self
    }

    #[must_use]
    pub fn has_more(mut self) -> Self {
        self.has_more = true;
        self
    }

    #[must_use]
    pub fn reports(mut self, fields: impl IntoIterator<Item = ReportField>) -> Self {
        for field in fields {
            if !self.reports.contains(&field) {
                self.reports.push(field);
            }
        }
        self
    }

    #[must_use]
    pub fn by_event_type(mut self) -> Self {
        self.by_event_type = true;
        self
    }

    #[must_use]
    pub fn by_state(mut self) -> Self {
        self.by_state = true;
        self
    }

    #[must_use]
    pub fn by_hour(mut self) -> Self {
        self.by_hour = true;
        self
    }

    #[must_use]
    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    fn render(&self, out: &mut String) {
        out.push('{');
        if self.total_count {
            out.push_str(" totalCount");
        }
        if self.has_more {
            out.push_str(" hasMore");
        }
        if !self.reports.is_empty() {
            out.push_str(" reports {");
            for field in &self.reports {
                out.push(' ');
                out.push_str(field.selection());
            }
            out.push_str(" }");
        }
        if self.by_event_type || self.by_state || self.by_hour {
            out.push_str(" aggregations {");
            if self.by_event_type {
                out.push_str(" byEventType { eventType count maxMeasurement { magnitude unit } }");
            }
            if self.by_state {
                out.push_str(" byState { state count counties { county count } }");
            }
            if self.by_hour {
                out.push_str(" byHour { bucket count }");
            }
            out.push_str(" }");
        }
        if self.meta {
            out.push_str(" meta { lastUpdated dataLagMinutes }");
        }
        out.push_str(" }");
    }
}

/// A complete `stormReports` query document.
#[derive(Debug, Clone, PartialEq)]
pub struct StormReportsQuery {
    pub filter: ReportFilter,
    pub selection: Selection,
}

impl StormReportsQuery {
    #[must_use]
    pub fn new(filter: ReportFilter, selection: Selection) -> Self {
        Self { filter, selection }
    }

    /// Render the GraphQL document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("{ stormReports(");
        self.filter.render(&mut out);
        out.push_str(") ");
        self.selection.render(&mut out);
        out.push_str(" }");
        out
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_string(out: &mut String, value: &str) {
    // serde_json escaping of a &str cannot fail
    match serde_json::to_string(value) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}

fn push_enum_list<'a>(out: &mut String, values: impl Iterator<Item = &'a str>) {
    out.push('[');
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(value);
    }
    out.push(']');
}
