//! Domain models for the legistats pipeline.
//!
//! - [`RawRow`] - one positional row of the raw export
//! - [`Period`] - reporting year/month announced by a marker row
//! - [`CountKind`] - basic or amending act count
//! - [`TidyRecord`] - one normalized output record
//! - [`DatasetName`] - filename convention for tidy tables and companions

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Raw rows
// =============================================================================

/// A raw positional row with up to three cells.
///
/// A cell is `None` when it was missing or blank in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub cells: [Option<String>; 3],
}

impl RawRow {
    /// Build a row from raw cell texts. Blank cells become absent, cells
    /// past the third are ignored.
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut row = Self::default();
        for (slot, cell) in row.cells.iter_mut().zip(cells) {
            let trimmed = cell.as_ref().trim();
            if !trimmed.is_empty() {
                *slot = Some(trimmed.to_string());
            }
        }
        row
    }

    pub fn col0(&self) -> Option<&str> {
        self.cells[0].as_deref()
    }

    pub fn col1(&self) -> Option<&str> {
        self.cells[1].as_deref()
    }

    pub fn col2(&self) -> Option<&str> {
        self.cells[2].as_deref()
    }

    /// True when all three cells are absent.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

// =============================================================================
// Output records
// =============================================================================

/// Reporting period announced by a "Statistics for" row.
///
/// Year and month keep the source text as-is (`"05"` stays `"05"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: String,
    pub month: String,
}

/// Which of the two counts a tidy record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountKind {
    Basic,
    Amending,
}

impl CountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Amending => "amending",
        }
    }
}

impl fmt::Display for CountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tidy record: `(year, month, category, act_type, type, count)`.
///
/// `count` is `None` when the source cell was not a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub year: String,
    pub month: String,
    pub category: String,
    pub act_type: String,
    #[serde(rename = "type")]
    pub count_kind: CountKind,
    pub count: Option<f64>,
}

impl TidyRecord {
    pub fn new(
        period: &Period,
        category: &str,
        act_type: &str,
        count_kind: CountKind,
        count: Option<f64>,
    ) -> Self {
        Self {
            year: period.year.clone(),
            month: period.month.clone(),
            category: category.to_string(),
            act_type: act_type.to_string(),
            count_kind,
            count,
        }
    }
}

// =============================================================================
// Dataset naming
// =============================================================================

/// Prefix of tidy table filenames.
pub const DATASET_PREFIX: &str = "legislative_acts_";

static DATASET_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})_(\d{1,2})$").expect("valid dataset date regex"));

/// Names derived from a tidy table path (`legislative_acts_2023_05.csv`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetName {
    /// Directory holding the tidy table.
    pub dir: PathBuf,
    /// File stem, e.g. `legislative_acts_2023_05`.
    pub stem: String,
    /// Dataset date part, e.g. `2023_05`. Falls back to the whole stem.
    pub date: String,
}

impl DatasetName {
    pub fn from_path(path: &Path) -> Self {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        let date = stem
            .strip_prefix(DATASET_PREFIX)
            .unwrap_or(&stem)
            .to_string();
        Self { dir, stem, date }
    }

    /// `(year, month)` when the dataset date follows `YYYY_MM`.
    pub fn year_month(&self) -> Option<(i32, u32)> {
        let caps = DATASET_DATE.captures(&self.date)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
    }

    /// Human readable period (`May 2023`), or the raw date string.
    pub fn display_date(&self) -> String {
        format_dataset_date(&self.date)
    }

    pub fn raw_copy_path(&self) -> PathBuf {
        self.dir.join(format!("{}_raw.csv", self.stem))
    }

    pub fn parser_source_path(&self) -> PathBuf {
        self.dir.join(format!("{}_parser.rs", self.stem))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(format!("{}_metadata.json", self.stem))
    }
}

/// Format a `YYYY_MM` dataset date as `Month YYYY`, leaving anything else untouched.
pub fn format_dataset_date(date: &str) -> String {
    DATASET_DATE
        .captures(date)
        .and_then(|caps| {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        })
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| date.to_string())
}

// =============================================================================
// Citation
// =============================================================================

/// Citation strings for a published dataset, persisted as `<stem>_metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub apa: String,
    pub mla: String,
    pub chicago: String,
    pub bibtex: String,
    pub doi: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_blank_cells_are_absent() {
        let row = RawRow::from_cells(["Regulations", "  ", ""]);
        assert_eq!(row.col0(), Some("Regulations"));
        assert_eq!(row.col1(), None);
        assert_eq!(row.col2(), None);
        assert!(!row.is_blank());
    }

    #[test]
    fn test_raw_row_short_and_long_rows() {
        let short = RawRow::from_cells(["only"]);
        assert_eq!(short.col2(), None);

        let long = RawRow::from_cells(["a", "b", "c", "d"]);
        assert_eq!(long.col2(), Some("c"));
        assert!(RawRow::from_cells(Vec::<String>::new()).is_blank());
    }

    #[test]
    fn test_dataset_name_from_path() {
        let name = DatasetName::from_path(Path::new("data/legislative_acts_2023_05.csv"));
        assert_eq!(name.stem, "legislative_acts_2023_05");
        assert_eq!(name.date, "2023_05");
        assert_eq!(name.year_month(), Some((2023, 5)));
        assert_eq!(name.display_date(), "May 2023");
        assert_eq!(
            name.metadata_path(),
            PathBuf::from("data/legislative_acts_2023_05_metadata.json")
        );
        assert_eq!(
            name.raw_copy_path(),
            PathBuf::from("data/legislative_acts_2023_05_raw.csv")
        );
    }

    #[test]
    fn test_unconventional_name_keeps_raw_date() {
        let name = DatasetName::from_path(Path::new("export.csv"));
        assert_eq!(name.date, "export");
        assert_eq!(name.year_month(), None);
        assert_eq!(name.display_date(), "export");
        assert_eq!(format_dataset_date("2023_13"), "2023_13");
    }

    #[test]
    fn test_count_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CountKind::Amending).unwrap(), "\"amending\"");
        assert_eq!(CountKind::Basic.to_string(), "basic");
    }
}
