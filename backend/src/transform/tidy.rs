//! Tidy table persistence.
//!
//! Columns: `year, month, category, act_type, type, count`, plus an
//! optional trailing `parsed_at` timestamp added by the caller.

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::io::Write;
use std::path::Path;

use crate::models::TidyRecord;

/// Column names of a tidy table.
pub const TIDY_COLUMNS: [&str; 6] = ["year", "month", "category", "act_type", "type", "count"];

/// Name of the optional timestamp column.
pub const PARSED_AT_COLUMN: &str = "parsed_at";

/// Render a count cell. Missing counts are empty, whole numbers have no fraction.
pub fn format_count(count: Option<f64>) -> String {
    match count {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Write records to any writer as a tidy CSV table.
pub fn write_tidy<W: Write>(
    writer: W,
    records: &[TidyRecord],
    parsed_at: Option<DateTime<Utc>>,
) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    let stamp = parsed_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));

    let mut header: Vec<&str> = TIDY_COLUMNS.to_vec();
    if stamp.is_some() {
        header.push(PARSED_AT_COLUMN);
    }
    writer.write_record(&header)?;

    for record in records {
        let count = format_count(record.count);
        let mut row = vec![
            record.year.as_str(),
            record.month.as_str(),
            record.category.as_str(),
            record.act_type.as_str(),
            record.count_kind.as_str(),
            count.as_str(),
        ];
        if let Some(ref s) = stamp {
            row.push(s.as_str());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write records to a tidy CSV file.
pub fn write_tidy_csv(
    path: &Path,
    records: &[TidyRecord],
    parsed_at: Option<DateTime<Utc>>,
) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_tidy(file, records, parsed_at)
}

/// Read a tidy table back. Extra columns are ignored.
pub fn read_tidy_csv(path: &Path) -> Result<Vec<TidyRecord>, csv::Error> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    reader.deserialize().collect()
}
