//! Shared helpers for harness integration tests: an in-process fake of the
//! query API serving a small synthetic dataset.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use stormcheck_harness::{haversine_miles, Expectations, HarnessConfig, Timing};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// One synthetic report.
#[derive(Debug, Clone)]
pub struct Row {
    pub id: &'static str,
    pub event_type: &'static str,
    pub magnitude: f64,
    pub unit: &'static str,
    pub severity: Option<&'static str>,
    pub lat: f64,
    pub lon: f64,
    pub state: &'static str,
    pub county: &'static str,
    pub name: &'static str,
    pub office: &'static str,
    pub direction: Option<&'static str>,
    pub hour: u32,
}

#[allow(clippy::too_many_arguments)]
fn row(
    id: &'static str,
    event_type: &'static str,
    magnitude: f64,
    unit: &'static str,
    severity: Option<&'static str>,
    (lat, lon): (f64, f64),
    (state, county, name): (&'static str, &'static str, &'static str),
    office: &'static str,
    direction: Option<&'static str>,
    hour: u32,
) -> Row {
    Row {
        id,
        event_type,
        magnitude,
        unit,
        severity,
        lat,
        lon,
        state,
        county,
        name,
        office,
        direction,
        hour,
    }
}

/// Twelve reports over five states; three lie within 50 miles of (41, -99).
pub fn dataset() -> Vec<Row> {
    vec![
        row("h1", "hail", 1.25, "in", Some("severe"), (31.04, -98.53), ("TX", "San Saba", "Chappel"), "SJT", Some("ESE"), 15),
        row("h2", "hail", 2.75, "in", Some("severe"), (41.10, -99.10), ("NE", "Custer", "Anselmo"), "LBF", Some("N"), 21),
        row("h3", "hail", 0.75, "in", None, (41.28, -98.57), ("NE", "Howard", "Elba"), "GID", None, 21),
        row("h4", "hail", 1.75, "in", Some("severe"), (41.59, -93.62), ("IA", "Polk", "Des Moines"), "DMX", Some("W"), 22),
        row("h5", "hail", 1.00, "in", None, (31.55, -97.15), ("TX", "McLennan", "Waco"), "FWD", None, 16),
        row("t1", "tornado", 0.0, "EF", None, (41.31, -96.24), ("NE", "Douglas", "Elkhorn"), "OAX", Some("N"), 18),
        row("t2", "tornado", 1.0, "EF", Some("severe"), (41.66, -95.33), ("IA", "Harrison", "Logan"), "OAX", None, 19),
        row("t3", "tornado", 2.0, "EF", Some("severe"), (40.92, -98.34), ("NE", "Hall", "Grand Island"), "GID", Some("SW"), 20),
        row("t4", "tornado", 0.0, "EF", None, (39.05, -95.68), ("KS", "Shawnee", "Topeka"), "TOP", None, 23),
        row("w1", "wind", 60.0, "mph", None, (35.47, -97.52), ("OK", "Oklahoma", "Oklahoma City"), "OUN", None, 17),
        row("w2", "wind", 70.0, "mph", Some("severe"), (41.13, -100.77), ("NE", "Lincoln", "North Platte"), "LBF", Some("E"), 22),
        row("w3", "wind", 65.0, "mph", Some("severe"), (42.03, -93.62), ("IA", "Story", "Ames"), "DMX", None, 23),
    ]
}

/// Expectations matching [`dataset`].
pub fn fake_expectations() -> Expectations {
    Expectations {
        total: 12,
        hail: 5,
        tornado: 4,
        wind: 3,
        state_count: 5,
        states: BTreeMap::from([
            ("NE".to_string(), 5),
            ("IA".to_string(), 3),
            ("TX".to_string(), 2),
        ]),
        ..Expectations::default()
    }
}

/// Millisecond-scale timings so failures resolve quickly.
pub fn fast_timing() -> Timing {
    Timing {
        health_interval_ms: 20,
        health_request_timeout_ms: 500,
        health_timeout_ms: 500,
        convergence_interval_ms: 20,
        convergence_deadline_ms: 400,
        query_timeout_ms: 2_000,
    }
}

/// Harness configuration pointing every service at `server`.
pub fn fake_config(server: &MockServer) -> HarnessConfig {
    HarnessConfig {
        api_url: server.uri(),
        collector_url: server.uri(),
        etl_url: server.uri(),
        fixture_dir: None,
        timing: fast_timing(),
        expectations: fake_expectations(),
    }
}

/// Filter arguments recovered from a rendered `stormReports` document.
#[derive(Debug, Default)]
struct ParsedFilter {
    event_types: Vec<String>,
    counties: Vec<String>,
    severity: Vec<String>,
    near: Option<(f64, f64, f64)>,
    sort_magnitude_desc: bool,
    limit: Option<usize>,
    offset: usize,
}

fn list_after(query: &str, key: &str) -> Vec<String> {
    let Some(start) = query.find(key) else {
        return Vec::new();
    };
    let rest = &query[start + key.len()..];
    let end = rest.find(']').unwrap_or(rest.len());
    rest[..end]
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn number_after(query: &str, key: &str) -> Option<f64> {
    let start = query.find(key)? + key.len();
    let rest = query[start..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_filter(query: &str) -> ParsedFilter {
    let near = match (
        number_after(query, "lat:"),
        number_after(query, "lon:"),
        number_after(query, "radiusMiles:"),
    ) {
        (Some(lat), Some(lon), Some(r)) if query.contains("near:") => Some((lat, lon, r)),
        _ => None,
    };
    ParsedFilter {
        event_types: list_after(query, "eventTypes: ["),
        counties: list_after(query, "counties: ["),
        severity: list_after(query, "severity: ["),
        near,
        sort_magnitude_desc: query.contains("sortBy: MAGNITUDE") && query.contains("sortOrder: DESC"),
        limit: number_after(query, "limit:").map(|n| n as usize),
        offset: number_after(query, "offset:").map_or(0, |n| n as usize),
    }
}

fn report_json(r: &Row) -> Value {
    json!({
        "id": r.id,
        "eventType": r.event_type,
        "geo": { "lat": r.lat, "lon": r.lon },
        "measurement": { "magnitude": r.magnitude, "unit": r.unit, "severity": r.severity },
        "beginTime": format!("2024-04-26T{:02}:10:00Z", r.hour),
        "endTime": format!("2024-04-26T{:02}:10:00Z", r.hour),
        "source": "spc",
        "sourceOffice": r.office,
        "location": {
            "raw": r.name,
            "name": r.name,
            "state": r.state,
            "county": r.county,
            "direction": r.direction,
            "distance": r.direction.map(|_| 3.0),
        },
        "comments": format!("({})", r.office),
        "timeBucket": format!("2024-04-26T{:02}:00:00Z", r.hour),
        "processedAt": "2024-04-26T23:59:00Z",
    })
}

/// Evaluate a `stormReports` document against `rows`.
pub fn evaluate(rows: &[Row], query: &str) -> Value {
    let filter = parse_filter(query);
    let mut matched: Vec<&Row> = rows
        .iter()
        .filter(|r| filter.event_types.is_empty() || filter.event_types.iter().any(|t| t == r.event_type))
        .filter(|r| {
            filter.counties.is_empty()
                || filter.counties.iter().any(|c| *c == r.county.to_lowercase())
        })
        .filter(|r| {
            filter.severity.is_empty()
                || r.severity.is_some_and(|s| filter.severity.iter().any(|f| f == s))
        })
        .filter(|r| {
            filter
                .near
                .is_none_or(|(lat, lon, radius)| haversine_miles(lat, lon, r.lat, r.lon) <= radius)
        })
        .collect();
    if filter.sort_magnitude_desc {
        matched.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    }

    let total = matched.len();
    let limit = filter.limit.unwrap_or(total);
    let page: Vec<Value> = matched
        .iter()
        .skip(filter.offset)
        .take(limit)
        .map(|r| report_json(r))
        .collect();
    let has_more = filter.offset + page.len() < total;

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_state: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for r in &matched {
        *by_type.entry(r.event_type).or_default() += 1;
        *by_state.entry(r.state).or_default().entry(r.county).or_default() += 1;
        *by_hour.entry(r.hour).or_default() += 1;
    }

    json!({ "data": { "stormReports": {
        "totalCount": total,
        "hasMore": has_more,
        "reports": page,
        "aggregations": {
            "totalCount": total,
            "byEventType": by_type
                .iter()
                .map(|(t, n)| json!({ "eventType": t, "count": n }))
                .collect::<Vec<_>>(),
            "byState": by_state
                .iter()
                .map(|(s, counties)| json!({
                    "state": s,
                    "count": counties.values().sum::<usize>(),
                    "counties": counties
                        .iter()
                        .map(|(c, n)| json!({ "county": c, "count": n }))
                        .collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>(),
            "byHour": by_hour
                .iter()
                .map(|(h, n)| json!({ "bucket": format!("2024-04-26T{h:02}:00:00Z"), "count": n }))
                .collect::<Vec<_>>(),
        },
        "meta": { "lastUpdated": "2024-04-26T23:59:00Z", "dataLagMinutes": 3 },
    }}})
}

fn query_text(request: &Request) -> String {
    serde_json::from_slice::<Value>(&request.body)
        .ok()
        .and_then(|v| v.get("query").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

/// Answers `/query` from a fixed dataset.
pub struct FakeQueryApi {
    rows: Vec<Row>,
}

impl FakeQueryApi {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl Respond for FakeQueryApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(evaluate(&self.rows, &query_text(request)))
    }
}

/// Answers `/query` with a `totalCount` that grows by `step` per request,
/// capped at `cap`.
pub struct GrowingCount {
    pub step: usize,
    pub cap: usize,
    pub calls: Arc<AtomicUsize>,
}

impl Respond for GrowingCount {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let count = (n * self.step).min(self.cap);
        ResponseTemplate::new(200).set_body_json(json!({
            "data": { "stormReports": { "totalCount": count } }
        }))
    }
}

/// Mount a 200 `/healthz` on `server`.
pub async fn mount_healthy(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .mount(server)
        .await;
}

/// A healthy fake API over [`dataset`].
pub async fn start_fake_pipeline() -> MockServer {
    start_fake_pipeline_with(dataset()).await
}

/// A healthy fake API over `rows`.
pub async fn start_fake_pipeline_with(rows: Vec<Row>) -> MockServer {
    let server = MockServer::start().await;
    mount_healthy(&server).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(FakeQueryApi::new(rows))
        .mount(&server)
        .await;
    server
}

/// Number of `/query` requests `server` has received.
pub async fn query_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/query")
        .count()
}
