//! Act-statistics normalizer.
//!
//! Walks the raw export row by row and rebuilds tidy records from its
//! loose layout: period markers, (possibly wrapped) category labels,
//! blank separators, subtotal rows and data rows.
//!
//! # Row kinds
//!
//! Each row is classified into exactly one [`RowKind`], first match wins:
//!
//! | Kind              | Shape                                               |
//! |-------------------|-----------------------------------------------------|
//! | `PeriodMarker`    | col0 contains `Statistics for`                      |
//! | `CategoryLabel`   | col0 only, without `Total`                          |
//! | `BlankSeparator`  | no cells                                            |
//! | `SubtotalMarker`  | col1 contains `Total`                               |
//! | `DataRow`         | all three cells, while a period and category are set|
//! | `Unmatched`       | anything else                                       |
//!
//! The kind is then applied to a [`NormalizerState`], which owns the
//! carried period/category context and emits records for data rows.
//!
//! ```text
//! Statistics for,2023,05          -> period = (2023, 05)
//! Regulations                     -> category = "Regulations"
//! Council Regulation,12,3         -> basic 12, amending 3
//! ```

use serde::Serialize;

use crate::models::{CountKind, Period, RawRow, TidyRecord};

const PERIOD_MARKER: &str = "Statistics for";
const TOTAL: &str = "Total";
const CATEGORY_JOINER: &str = " - ";

/// Classification of one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    PeriodMarker { period: Option<Period> },
    CategoryLabel { label: String },
    BlankSeparator,
    SubtotalMarker,
    DataRow {
        act_type: String,
        basic: Option<f64>,
        amending: Option<f64>,
        coerced: usize,
    },
    Unmatched,
}

impl RowKind {
    /// Short name used by the `classify` command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeriodMarker { .. } => "period",
            Self::CategoryLabel { .. } => "category",
            Self::BlankSeparator => "blank",
            Self::SubtotalMarker => "subtotal",
            Self::DataRow { .. } => "data",
            Self::Unmatched => "skipped",
        }
    }
}

/// Behaviour switches for [`normalize_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Let a subtotal row end a wrapped category label.
    ///
    /// Off by default so output matches previously published datasets,
    /// where a label following a subtotal row is still appended to the
    /// current category.
    pub reset_continuation_on_subtotal: bool,
}

/// Counters describing what the normalizer did with the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub rows_seen: usize,
    pub period_rows: usize,
    pub category_rows: usize,
    pub blank_rows: usize,
    pub subtotal_rows: usize,
    pub data_rows: usize,
    pub skipped_rows: usize,
    /// Count cells that were not numbers and became missing values.
    pub coerced_cells: usize,
    /// Records removed because their act type was `Total`.
    pub total_records_dropped: usize,
}

/// Result of a normalization run.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<TidyRecord>,
    pub diagnostics: Diagnostics,
}

/// Carried parser context. Fresh for every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizerState {
    pub current_period: Option<Period>,
    pub current_category: Option<String>,
    pub category_continues: bool,
    options: NormalizeOptions,
}

impl NormalizerState {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// True when data rows can be turned into records.
    pub fn has_context(&self) -> bool {
        self.current_period.is_some() && self.current_category.is_some()
    }

    /// Classify a row against the current context.
    pub fn classify(&self, row: &RawRow) -> RowKind {
        let (c0, c1, c2) = (row.col0(), row.col1(), row.col2());

        if c0.is_some_and(|v| v.contains(PERIOD_MARKER)) {
            let period = match (c1, c2) {
                (Some(year), Some(month)) => Some(Period {
                    year: year.to_string(),
                    month: month.to_string(),
                }),
                _ => None,
            };
            return RowKind::PeriodMarker { period };
        }

        if let (Some(label), None, None) = (c0, c1, c2) {
            if !label.contains(TOTAL) {
                return RowKind::CategoryLabel {
                    label: label.to_string(),
                };
            }
        }

        if row.is_blank() {
            return RowKind::BlankSeparator;
        }

        if c1.is_some_and(|v| v.contains(TOTAL)) {
            return RowKind::SubtotalMarker;
        }

        if let (true, Some(act_type), Some(basic), Some(amending)) = (self.has_context(), c0, c1, c2) {
            let basic = parse_count(basic);
            let amending = parse_count(amending);
            let coerced = usize::from(basic.is_none()) + usize::from(amending.is_none());
            return RowKind::DataRow {
                act_type: act_type.to_string(),
                basic,
                amending,
                coerced,
            };
        }

        RowKind::Unmatched
    }

    /// Apply a classified row, returning the records it produces.
    pub fn apply(&mut self, kind: RowKind) -> Vec<TidyRecord> {
        match kind {
            RowKind::PeriodMarker { period } => {
                self.current_period = period;
                self.current_category = None;
                self.category_continues = false;
                Vec::new()
            }
            RowKind::CategoryLabel { label } => {
                self.current_category = match self.current_category.take() {
                    Some(current) if self.category_continues => {
                        Some(format!("{}{}{}", current, CATEGORY_JOINER, label))
                    }
                    _ => Some(label),
                };
                self.category_continues = true;
                Vec::new()
            }
            RowKind::BlankSeparator => {
                self.current_period = None;
                self.current_category = None;
                self.category_continues = false;
                Vec::new()
            }
            RowKind::SubtotalMarker => {
                if self.options.reset_continuation_on_subtotal {
                    self.category_continues = false;
                }
                Vec::new()
            }
            RowKind::DataRow {
                act_type,
                basic,
                amending,
                ..
            } => {
                self.category_continues = false;
                match (&self.current_period, &self.current_category) {
                    (Some(period), Some(category)) => vec![
                        TidyRecord::new(period, category, &act_type, CountKind::Basic, basic),
                        TidyRecord::new(period, category, &act_type, CountKind::Amending, amending),
                    ],
                    _ => Vec::new(),
                }
            }
            RowKind::Unmatched => Vec::new(),
        }
    }
}

/// Parse a count cell. Anything that is not a finite number is missing.
pub fn parse_count(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize raw rows with default options.
pub fn normalize(rows: &[RawRow]) -> Normalized {
    normalize_with(rows, NormalizeOptions::default())
}

/// Normalize raw rows into tidy records, in input order.
pub fn normalize_with(rows: &[RawRow], options: NormalizeOptions) -> Normalized {
    let mut state = NormalizerState::new(options);
    let mut diagnostics = Diagnostics::default();
    let mut records = Vec::new();

    for row in rows {
        let kind = state.classify(row);
        diagnostics.rows_seen += 1;
        match &kind {
            RowKind::PeriodMarker { .. } => diagnostics.period_rows += 1,
            RowKind::CategoryLabel { .. } => diagnostics.category_rows += 1,
            RowKind::BlankSeparator => diagnostics.blank_rows += 1,
            RowKind::SubtotalMarker => diagnostics.subtotal_rows += 1,
            RowKind::DataRow { coerced, .. } => {
                diagnostics.data_rows += 1;
                diagnostics.coerced_cells += coerced;
            }
            RowKind::Unmatched => diagnostics.skipped_rows += 1,
        }
        records.extend(state.apply(kind));
    }

    let before = records.len();
    records.retain(|r| r.act_type != TOTAL);
    diagnostics.total_records_dropped = before - records.len();

    Normalized {
        records,
        diagnostics,
    }
}
