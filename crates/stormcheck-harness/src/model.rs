//! Typed view of the `stormReports` GraphQL response.
//!
//! Every struct defaults missing members so that a response only needs to
//! contain the fields the query selected. Nullable members of the schema are
//! `Option`s; their absence is never an error at this layer. An explicit
//! `null` in a non-nullable member decodes to the zero value, so that the
//! invariant checks report it instead of the whole response failing to decode.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// GraphQL response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

impl GraphQlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.message);
        }
        let path: Vec<String> = self
            .path
            .iter()
            .map(|p| match p {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        write!(f, "{} (at {})", self.message, path.join("."))
    }
}

/// `data` member of a `stormReports` query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StormReportsData {
    pub storm_reports: StormReportsResult,
}

/// Result of the `stormReports` root field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StormReportsResult {
    #[serde(deserialize_with = "null_default")]
    pub total_count: usize,
    #[serde(deserialize_with = "null_default")]
    pub has_more: bool,
    #[serde(deserialize_with = "null_default")]
    pub reports: Vec<StormReport>,
    pub aggregations: Option<StormAggregations>,
    pub meta: Option<QueryMeta>,
}

/// Severe-weather event types reported by SPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Hail,
    Tornado,
    Wind,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Hail, EventType::Tornado, EventType::Wind];

    /// Lowercase name as returned in responses.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hail => "hail",
            Self::Tornado => "tornado",
            Self::Wind => "wind",
        }
    }

    /// Parses a response name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    /// Enum value used in filter arguments.
    #[must_use]
    pub fn graphql_value(self) -> &'static str {
        match self {
            Self::Hail => "HAIL",
            Self::Tornado => "TORNADO",
            Self::Wind => "WIND",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<stormcheck_fixtures::ReportKind> for EventType {
    fn from(kind: stormcheck_fixtures::ReportKind) -> Self {
        match kind {
            stormcheck_fixtures::ReportKind::Tornado => Self::Tornado,
            stormcheck_fixtures::ReportKind::Hail => Self::Hail,
            stormcheck_fixtures::ReportKind::Wind => Self::Wind,
        }
    }
}

/// A single enriched storm report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StormReport {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    /// Raw type name; see [`StormReport::kind`].
    pub event_type: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub geo: Geo,
    #[serde(deserialize_with = "null_default")]
    pub measurement: Measurement,
    #[serde(deserialize_with = "null_default")]
    pub begin_time: String,
    #[serde(deserialize_with = "null_default")]
    pub end_time: String,
    #[serde(deserialize_with = "null_default")]
    pub source: String,
    #[serde(deserialize_with = "null_default")]
    pub source_office: String,
    #[serde(deserialize_with = "null_default")]
    pub location: Location,
    #[serde(deserialize_with = "null_default")]
    pub comments: String,
    #[serde(deserialize_with = "null_default")]
    pub time_bucket: String,
    #[serde(deserialize_with = "null_default")]
    pub processed_at: String,
    pub geocoding: Option<Geocoding>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Geo {
    #[serde(deserialize_with = "null_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_default")]
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Measurement {
    #[serde(deserialize_with = "null_default")]
    pub magnitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub unit: String,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "null_default")]
    pub raw: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub distance: Option<f64>,
    pub direction: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub state: String,
    #[serde(deserialize_with = "null_default")]
    pub county: String,
}

impl StormReport {
    /// Typed event type; `None` when absent or not a known type.
    #[must_use]
    pub fn kind(&self) -> Option<EventType> {
        self.event_type.as_deref().and_then(EventType::from_name)
    }
}

/// Geocoder output attached by the ETL stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Geocoding {
    #[serde(deserialize_with = "null_default")]
    pub formatted_address: String,
    #[serde(deserialize_with = "null_default")]
    pub place_name: String,
    #[serde(deserialize_with = "null_default")]
    pub confidence: f64,
    #[serde(deserialize_with = "null_default")]
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StormAggregations {
    #[serde(deserialize_with = "null_default")]
    pub total_count: usize,
    #[serde(deserialize_with = "null_default")]
    pub by_event_type: Vec<EventTypeGroup>,
    #[serde(deserialize_with = "null_default")]
    pub by_state: Vec<StateGroup>,
    #[serde(deserialize_with = "null_default")]
    pub by_hour: Vec<TimeGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventTypeGroup {
    #[serde(deserialize_with = "null_default")]
    pub event_type: String,
    #[serde(deserialize_with = "null_default")]
    pub count: usize,
    pub max_measurement: Option<Measurement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateGroup {
    #[serde(deserialize_with = "null_default")]
    pub state: String,
    #[serde(deserialize_with = "null_default")]
    pub count: usize,
    #[serde(deserialize_with = "null_default")]
    pub counties: Vec<CountyGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountyGroup {
    #[serde(deserialize_with = "null_default")]
    pub county: String,
    #[serde(deserialize_with = "null_default")]
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeGroup {
    #[serde(deserialize_with = "null_default")]
    pub bucket: String,
    #[serde(deserialize_with = "null_default")]
    pub count: usize,
}

/// Freshness metadata. Both members are nullable in the schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryMeta {
    pub last_updated: Option<String>,
    pub data_lag_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_report() {
        let body = json!({
            "data": { "stormReports": {
                "totalCount": 1,
                "hasMore": false,
                "reports": [{
                    "id": "hail-1",
                    "eventType": "hail",
                    "geo": { "lat": 31.04, "lon": -98.53 },
                    "measurement": { "magnitude": 1.25, "unit": "in", "severity": null },
                    "sourceOffice": "SJT",
                    "location": {
                        "raw": "3 ESE Chappel", "name": "Chappel", "state": "TX",
                        "county": "San Saba", "direction": "ESE", "distance": 3.0
                    },
                    "geocoding": {
                        "formattedAddress": "Chappel, TX", "placeName": "Chappel",
                        "confidence": 0.9, "source": "gazetteer"
                    }
                }]
            }}
        });

        let resp: GraphQlResponse<StormReportsData> =
            serde_json::from_value(body).expect("decode");
        assert!(resp.errors.is_empty());
        let sr = resp.data.expect("data").storm_reports;
        let r = &sr.reports[0];
        assert_eq!(r.kind(), Some(EventType::Hail));
        assert_eq!(r.location.direction.as_deref(), Some("ESE"));
        assert_eq!(r.location.distance, Some(3.0));
        assert_eq!(r.measurement.severity, None);
        assert_eq!(
            r.geocoding.as_ref().map(|g| g.place_name.as_str()),
            Some("Chappel")
        );
        assert!(sr.aggregations.is_none());
        assert!(sr.meta.is_none());
    }

    #[test]
    fn test_decode_partial_selection() {
        let body = json!({ "data": { "stormReports": { "reports": [{ "id": "a" }, { "id": "b" }] } } });
        let resp: GraphQlResponse<StormReportsData> =
            serde_json::from_value(body).expect("decode");
        let sr = resp.data.expect("data").storm_reports;
        assert_eq!(sr.total_count, 0);
        assert_eq!(sr.reports.len(), 1);
        assert_eq!(sr.reports[1].kind(), None);
    }

    #[test]
    fn test_decode_aggregations_and_meta() {
        let body = json!({ "data": { "stormReports": {
            "totalCount": 3,
            "aggregations": {
                "byEventType": [{ "eventType": "hail", "count": 3,
                                  "maxMeasurement": { "magnitude": 2.0, "unit": "in" } }],
                "byState": [{ "state": "TX", "count": 3,
                              "counties": [{ "county": "San Saba", "count": 3 }] }],
                "byHour": [{ "bucket": "2024-04-26T15:00:00Z", "count": 3 }]
            },
            "meta": { "lastUpdated": "2024-04-27T00:00:00Z", "dataLagMinutes": 12 }
        } } });
        let resp: GraphQlResponse<StormReportsData> =
            serde_json::from_value(body).expect("decode");
        let sr = resp.data.expect("data").storm_reports;
        let aggs = sr.aggregations.expect("aggregations");
        assert_eq!(aggs.by_state[0].counties[0].county, "San Saba");
        assert_eq!(
            aggs.by_event_type[0].max_measurement.as_ref().map(|m| m.magnitude),
            Some(2.0)
        );
        let meta = sr.meta.expect("meta");
        assert_eq!(meta.data_lag_minutes, Some(12));
    }

    #[test]
    fn test_decode_errors_without_data() {
        let body = json!({ "data": null, "errors": [{ "message": "boom", "path": ["stormReports", 0] }] });
        let resp: GraphQlResponse<StormReportsData> =
            serde_json::from_value(body).expect("decode");
        assert!(resp.data.is_none());
        assert_eq!(resp.errors[0].to_string(), "boom (at stormReports.0)");
    }

    #[test]
    fn test_nulls_decode_to_empty_values() {
        let body = json!({ "data": { "stormReports": {
            "totalCount": 2,
            "hasMore": null,
            "reports": [{
                "id": "r1",
                "eventType": "hurricane",
                "geo": null,
                "measurement": { "magnitude": null, "unit": null, "severity": null },
                "location": { "name": "Elba", "state": "NE", "county": null },
                "timeBucket": null,
                "processedAt": null
            }],
            "aggregations": { "byEventType": null, "byState": [{ "state": "NE", "count": 1, "counties": null }], "byHour": null }
        } } });
        let resp: GraphQlResponse<StormReportsData> =
            serde_json::from_value(body).expect("decode");
        let sr = resp.data.expect("data").storm_reports;
        assert!(!sr.has_more);
        assert_eq!(sr.reports.len(), 1);

        let r = &sr.reports[0];
        assert_eq!(r.event_type.as_deref(), Some("hurricane"));
        assert_eq!(r.kind(), None);
        assert_eq!(r.geo, Geo::default());
        assert_eq!(r.measurement.unit, "");
        assert_eq!(r.location.county, "");
        assert_eq!(r.time_bucket, "");
        assert_eq!(r.processed_at, "");

        let aggs = sr.aggregations.expect("aggregations");
        assert!(aggs.by_event_type.is_empty());
        assert!(aggs.by_hour.is_empty());
        assert!(aggs.by_state[0].counties.is_empty());
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::from_name("TORNADO"), Some(EventType::Tornado));
        assert_eq!(EventType::from_name("hail"), Some(EventType::Hail));
        assert_eq!(EventType::from_name("hurricane"), None);
        assert_eq!(EventType::Tornado.as_str(), "tornado");
        assert_eq!(EventType::Tornado.graphql_value(), "TORNADO");
        assert_eq!(
            EventType::from(stormcheck_fixtures::ReportKind::Tornado),
            EventType::Tornado
        );
    }
}
