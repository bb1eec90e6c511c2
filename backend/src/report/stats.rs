//! Summary aggregates over tidy records.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CountKind, TidyRecord};

/// Basic / amending / total sums. Missing counts are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counts {
    pub basic: f64,
    pub amending: f64,
    pub total: f64,
}

impl Counts {
    fn add(&mut self, record: &TidyRecord) {
        let Some(count) = record.count else {
            return;
        };
        match record.count_kind {
            CountKind::Basic => self.basic += count,
            CountKind::Amending => self.amending += count,
        }
        self.total += count;
    }
}

/// One row of a grouped table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: String,
    /// Secondary key (act type) for the detailed table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_key: Option<String>,
    pub counts: Counts,
}

/// Aggregates for one tidy table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub overall: Counts,
    pub by_year: Vec<GroupRow>,
    pub by_category: Vec<GroupRow>,
    pub by_category_act_type: Vec<GroupRow>,
    pub record_count: usize,
}

/// Group and sum records by year, category and category × act type.
///
/// Groups are sorted by key.
pub fn summarize(records: &[TidyRecord]) -> Summary {
    let mut overall = Counts::default();
    let mut by_year: BTreeMap<&str, Counts> = BTreeMap::new();
    let mut by_category: BTreeMap<&str, Counts> = BTreeMap::new();
    let mut detailed: BTreeMap<(&str, &str), Counts> = BTreeMap::new();

    for record in records {
        overall.add(record);
        by_year.entry(record.year.as_str()).or_default().add(record);
        by_category
            .entry(record.category.as_str())
            .or_default()
            .add(record);
        detailed
            .entry((record.category.as_str(), record.act_type.as_str()))
            .or_default()
            .add(record);
    }

    Summary {
        overall,
        by_year: group_rows(by_year),
        by_category: group_rows(by_category),
        by_category_act_type: detailed
            .into_iter()
            .map(|((category, act_type), counts)| GroupRow {
                key: category.to_string(),
                sub_key: Some(act_type.to_string()),
                counts,
            })
            .collect(),
        record_count: records.len(),
    }
}

fn group_rows(map: BTreeMap<&str, Counts>) -> Vec<GroupRow> {
    map.into_iter()
        .map(|(key, counts)| GroupRow {
            key: key.to_string(),
            sub_key: None,
            counts,
        })
        .collect()
}
