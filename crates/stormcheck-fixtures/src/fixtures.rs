//! Fixture discovery for the storm report feed.
//!
//! Fixtures follow the SPC daily file naming convention
//! `{YYMMDD}_rpts_{torn|hail|wind}.csv`. Exactly one file is selected per
//! report kind: the first match of `*_rpts_{kind}.csv` in sorted order.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{FixtureError, Result};

/// The three SPC report files published per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Tornado,
    Hail,
    Wind,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Tornado, ReportKind::Hail, ReportKind::Wind];

    /// Short code used in SPC file names (`torn`, `hail`, `wind`).
    #[must_use]
    pub fn file_code(self) -> &'static str {
        match self {
            Self::Tornado => "torn",
            Self::Hail => "hail",
            Self::Wind => "wind",
        }
    }

    /// Event type name used by the pipeline (`tornado`, `hail`, `wind`).
    #[must_use]
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Tornado => "tornado",
            Self::Hail => "hail",
            Self::Wind => "wind",
        }
    }

    /// File name suffix shared by every fixture of this kind.
    #[must_use]
    pub fn suffix(self) -> String {
        format!("_rpts_{}.csv", self.file_code())
    }

    /// Resolves a requested file name such as `240426_rpts_hail.csv`.
    ///
    /// The date prefix is ignored: any name ending in a known suffix maps to
    /// that kind.
    #[must_use]
    pub fn from_request_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.ends_with(&kind.suffix()))
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_code())
    }
}

/// A fixture file selected for a report kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub kind: ReportKind,
    pub path: PathBuf,
    /// Date embedded in the first six characters of the file name, if valid.
    pub date: Option<NaiveDate>,
}

impl Fixture {
    /// File name without directory, for logging.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Inventory entry describing one fixture on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub kind: ReportKind,
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
    /// Data rows, header excluded.
    pub rows: usize,
}

/// Parses the `YYMMDD` prefix of a fixture file name.
///
/// Two-digit years 69-99 map to 19xx, 00-68 to 20xx.
#[must_use]
pub fn fixture_date(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..6)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%y%m%d").ok()
}

/// Read-only view over a fixture directory.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Selects the fixture for `kind`, the first match in sorted order.
    pub fn locate(&self, kind: ReportKind) -> Result<Fixture> {
        let pattern = format!(
            "{}/*{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            kind.suffix()
        );
        let paths = glob::glob(&pattern).map_err(|e| FixtureError::Pattern(e.to_string()))?;

        // glob yields entries in alphabetical order; unreadable entries are skipped
        let path = paths
            .filter_map(std::result::Result::ok)
            .next()
            .ok_or(FixtureError::NotFound(kind))?;

        let date = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(fixture_date);

        Ok(Fixture { kind, path, date })
    }

    /// Lists the selected fixture of every kind present, with row counts.
    pub fn inventory(&self) -> Result<Vec<FixtureSummary>> {
        let mut summaries = Vec::new();
        for kind in ReportKind::ALL {
            let fixture = match self.locate(kind) {
                Ok(fixture) => fixture,
                Err(FixtureError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let rows = count_rows(&fixture.path)?;
            summaries.push(FixtureSummary {
                kind,
                path: fixture.path,
                date: fixture.date,
                rows,
            });
        }
        Ok(summaries)
    }
}

fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| FixtureError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = 0;
    for record in reader.records() {
        record.map_err(|e| FixtureError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        rows += 1;
    }
    Ok(rows)
}
