//! Static report assembly.
//!
//! Reads every tidy table in a directory, aggregates it, and renders one
//! page per table plus an index page linking them, newest first.
//!
//! ```text
//! data/legislative_acts_2023_05.csv ─┐
//! data/legislative_acts_2023_04.csv ─┼─▶ summarize ─▶ site/stats/*.html
//! data/*_metadata.json (citations) ──┘                site/index.html
//! ```

pub mod render;
pub mod stats;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, ReportResult};
use crate::logs::log_warning;
use crate::models::{Citation, DatasetName, TidyRecord, DATASET_PREFIX};
use crate::transform::tidy::read_tidy_csv;
use crate::validation::is_valid_citation;

pub use render::{render_site, SiteOutput};
pub use stats::{summarize, Counts, GroupRow, Summary};

/// One tidy table and everything the report shows about it.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub name: DatasetName,
    pub path: PathBuf,
    pub records: Vec<TidyRecord>,
    pub citation: Option<Citation>,
    pub summary: Summary,
}

impl DatasetReport {
    /// Load a tidy table and its optional citation file.
    pub fn load(path: &Path) -> ReportResult<Self> {
        let name = DatasetName::from_path(path);
        let records = read_tidy_csv(path).map_err(|source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let citation = load_citation(&name.metadata_path());
        let summary = summarize(&records);

        Ok(Self {
            name,
            path: path.to_path_buf(),
            records,
            citation,
            summary,
        })
    }

    fn recency_key(&self) -> (Option<(i32, u32)>, &str) {
        (self.name.year_month(), self.name.stem.as_str())
    }
}

/// True for `legislative_acts_*.csv` files that are not raw copies.
pub fn is_tidy_table(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(DATASET_PREFIX) && name.ends_with(".csv") && !name.ends_with("_raw.csv")
}

/// Load every tidy table in `data_dir`, newest dataset first.
pub fn collect_reports(data_dir: &Path) -> ReportResult<Vec<DatasetReport>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_tidy_table(path))
        .collect();
    paths.sort();

    let mut reports = paths
        .iter()
        .map(|p| DatasetReport::load(p))
        .collect::<ReportResult<Vec<_>>>()?;

    reports.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
    Ok(reports)
}

fn load_citation(path: &Path) -> Option<Citation> {
    let content = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            log_warning(format!("Ignoring unreadable {}: {}", path.display(), e));
            return None;
        }
    };
    if !is_valid_citation(&value) {
        log_warning(format!("Ignoring malformed citation file {}", path.display()));
        return None;
    }
    serde_json::from_value(value).ok()
}
