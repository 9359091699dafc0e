//! Harness configuration.
//!
//! Values are layered with `figment`, later sources overriding earlier ones:
//!
//! 1. built-in defaults (local ports, the 2024-04-26 fixture dataset)
//! 2. a TOML file, `$STORMCHECK_CONFIG` or `./stormcheck.toml` if present
//! 3. `API_URL`, `COLLECTOR_URL`, `ETL_URL`, `FIXTURE_DIR`
//! 4. `STORMCHECK_*` variables, `__` separating nested keys
//!    (e.g. `STORMCHECK_EXPECTATIONS__TOTAL=9`)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use stormcheck_fixtures::FixtureStore;

use crate::error::Result;
use crate::model::EventType;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "STORMCHECK_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "stormcheck.toml";

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub api_url: String,
    pub collector_url: String,
    pub etl_url: String,
    /// When set, per-type counts are taken from the fixtures in this directory.
    pub fixture_dir: Option<PathBuf>,
    pub timing: Timing,
    pub expectations: Expectations,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            collector_url: "http://localhost:3000".to_string(),
            etl_url: "http://localhost:8081".to_string(),
            fixture_dir: None,
            timing: Timing::default(),
            expectations: Expectations::default(),
        }
    }
}

impl HarnessConfig {
    /// Layered configuration sources.
    #[must_use]
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::raw().only(&["API_URL", "COLLECTOR_URL", "ETL_URL", "FIXTURE_DIR"]))
            .merge(Env::prefixed("STORMCHECK_").ignore(&["CONFIG"]).split("__"))
    }

    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().map_err(Box::new)?;
        config.expectations.geo_probe.validate()?;
        Ok(config)
    }

    /// Expectations with fixture-derived counts applied, if `fixture_dir` is set.
    pub fn expectations(&self) -> Result<Expectations> {
        self.expectations.geo_probe.validate()?;
        match &self.fixture_dir {
            Some(dir) => self.expectations.with_fixture_counts(&FixtureStore::new(dir)),
            None => Ok(self.expectations.clone()),
        }
    }
}

/// Poll intervals and deadlines, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub health_interval_ms: u64,
    pub health_request_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub convergence_interval_ms: u64,
    pub convergence_deadline_ms: u64,
    pub query_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            health_interval_ms: 2_000,
            health_request_timeout_ms: 5_000,
            health_timeout_ms: 60_000,
            convergence_interval_ms: 5_000,
            convergence_deadline_ms: 120_000,
            query_timeout_ms: 10_000,
        }
    }
}

impl Timing {
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    #[must_use]
    pub fn health_request_timeout(&self) -> Duration {
        Duration::from_millis(self.health_request_timeout_ms)
    }

    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    #[must_use]
    pub fn convergence_interval(&self) -> Duration {
        Duration::from_millis(self.convergence_interval_ms)
    }

    #[must_use]
    pub fn convergence_deadline(&self) -> Duration {
        Duration::from_millis(self.convergence_deadline_ms)
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// What the pipeline should produce from the fixture set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expectations {
    /// Date embedded in the fixture names; scenarios query this UTC day.
    pub fixture_date: NaiveDate,
    pub total: usize,
    pub hail: usize,
    pub tornado: usize,
    pub wind: usize,
    pub state_count: usize,
    /// Exact counts for selected states.
    pub states: BTreeMap<String, usize>,
    pub spot_check: Option<SpotCheck>,
    pub geo_probe: GeoProbe,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            fixture_date: NaiveDate::from_ymd_opt(2024, 4, 26).unwrap_or_default(),
            total: 271,
            hail: 79,
            tornado: 149,
            wind: 43,
            state_count: 11,
            states: BTreeMap::from([
                ("NE".to_string(), 100),
                ("IA".to_string(), 69),
                ("TX".to_string(), 39),
            ]),
            spot_check: Some(SpotCheck::default()),
            geo_probe: GeoProbe::default(),
        }
    }
}

impl Expectations {
    /// Expected count for one event type.
    #[must_use]
    pub fn count_for(&self, event_type: EventType) -> usize {
        match event_type {
            EventType::Hail => self.hail,
            EventType::Tornado => self.tornado,
            EventType::Wind => self.wind,
        }
    }

    #[must_use]
    pub fn event_type_counts(&self) -> BTreeMap<EventType, usize> {
        EventType::ALL
            .into_iter()
            .map(|t| (t, self.count_for(t)))
            .collect()
    }

    /// Replace per-type counts and total with fixture row counts.
    ///
    /// Kinds without a fixture count as zero. The fixture date is taken from
    /// the first dated fixture.
    pub fn with_fixture_counts(&self, store: &FixtureStore) -> Result<Self> {
        let inventory = store.inventory()?;
        let mut expectations = self.clone();
        expectations.hail = 0;
        expectations.tornado = 0;
        expectations.wind = 0;
        for summary in &inventory {
            match EventType::from(summary.kind) {
                EventType::Hail => expectations.hail = summary.rows,
                EventType::Tornado => expectations.tornado = summary.rows,
                EventType::Wind => expectations.wind = summary.rows,
            }
        }
        expectations.total = expectations.hail + expectations.tornado + expectations.wind;
        if let Some(date) = inventory.iter().find_map(|s| s.date) {
            expectations.fixture_date = date;
        }
        tracing::info!(
            total = expectations.total,
            hail = expectations.hail,
            tornado = expectations.tornado,
            wind = expectations.wind,
            dir = %store.dir().display(),
            "expected counts derived from fixtures"
        );
        Ok(expectations)
    }
}

/// A known report used to verify field-level enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotCheck {
    pub event_type: EventType,
    pub county: String,
    pub magnitude: f64,
    pub unit: String,
    pub source_office: String,
    pub name: String,
    pub state: String,
    pub direction: Option<String>,
}

impl Default for SpotCheck {
    fn default() -> Self {
        Self {
            event_type: EventType::Hail,
            county: "San Saba".to_string(),
            magnitude: 1.25,
            unit: "in".to_string(),
            source_office: "SJT".to_string(),
            name: "Chappel".to_string(),
            state: "TX".to_string(),
            direction: Some("ESE".to_string()),
        }
    }
}

/// Center and radius for the geo filter scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoProbe {
    pub lat: f64,
    pub lon: f64,
    pub radius_miles: f64,
    /// Slack added to the radius when checking returned distances.
    pub tolerance_miles: f64,
}

impl Default for GeoProbe {
    fn default() -> Self {
        // Approximate center of Nebraska.
        Self {
            lat: 41.0,
            lon: -99.0,
            radius_miles: 50.0,
            tolerance_miles: 5.0,
        }
    }
}

impl GeoProbe {
    /// Every coordinate and distance must be finite to render as a query argument.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("lat", self.lat),
            ("lon", self.lon),
            ("radius_miles", self.radius_miles),
            ("tolerance_miles", self.tolerance_miles),
        ];
        match fields.iter().find(|(_, value)| !value.is_finite()) {
            Some((key, value)) => Err(Box::new(figment::Error::from(format!(
                "expectations.geo_probe.{key} must be finite, got {value}"
            )))
            .into()),
            None => Ok(()),
        }
    }
}
