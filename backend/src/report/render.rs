//! HTML rendering for the static report site.
//!
//! Templates are embedded at compile time and rendered through Handlebars,
//! which HTML-escapes every interpolated value.

use chrono::Utc;
use handlebars::Handlebars;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::stats::{Counts, GroupRow};
use super::DatasetReport;
use crate::error::ReportResult;
use crate::logs::{log_info, log_success};
use crate::models::Citation;
use crate::transform::tidy::format_count;

const STATS_TEMPLATE: &str = include_str!("../../templates/stats.hbs");
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.hbs");

/// Subdirectory holding one page per dataset.
pub const STATS_DIR: &str = "stats";

// =============================================================================
// View models
// =============================================================================

#[derive(Debug, Serialize)]
struct CountsView {
    basic: String,
    amending: String,
    total: String,
}

impl From<&Counts> for CountsView {
    fn from(counts: &Counts) -> Self {
        Self {
            basic: format_count(Some(counts.basic)),
            amending: format_count(Some(counts.amending)),
            total: format_count(Some(counts.total)),
        }
    }
}

#[derive(Debug, Serialize)]
struct RowView<'a> {
    key: &'a str,
    sub_key: &'a str,
    #[serde(flatten)]
    counts: CountsView,
}

impl<'a> From<&'a GroupRow> for RowView<'a> {
    fn from(row: &'a GroupRow) -> Self {
        Self {
            key: &row.key,
            sub_key: row.sub_key.as_deref().unwrap_or_default(),
            counts: CountsView::from(&row.counts),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsPage<'a> {
    title: String,
    period: String,
    citation: Option<&'a Citation>,
    overall: CountsView,
    record_count: usize,
    by_year: Vec<RowView<'a>>,
    by_category: Vec<RowView<'a>>,
    detailed: Vec<RowView<'a>>,
}

impl<'a> StatsPage<'a> {
    fn new(report: &'a DatasetReport) -> Self {
        let summary = &report.summary;
        let period = report.name.display_date();
        Self {
            title: format!("EU Legislative Acts Statistics - {period}"),
            period,
            citation: report.citation.as_ref(),
            overall: CountsView::from(&summary.overall),
            record_count: summary.record_count,
            by_year: summary.by_year.iter().map(RowView::from).collect(),
            by_category: summary.by_category.iter().map(RowView::from).collect(),
            detailed: summary.by_category_act_type.iter().map(RowView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    period: String,
    href: String,
    doi: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct IndexPage<'a> {
    reports: Vec<IndexEntry<'a>>,
    latest: Option<String>,
    generated_at: String,
}

// =============================================================================
// Rendering
// =============================================================================

/// Files written by [`render_site`].
#[derive(Debug, Clone)]
pub struct SiteOutput {
    pub index: PathBuf,
    pub pages: Vec<PathBuf>,
}

fn registry() -> ReportResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_template_string("stats", STATS_TEMPLATE)?;
    handlebars.register_template_string("index", INDEX_TEMPLATE)?;
    Ok(handlebars)
}

fn page_href(report: &DatasetReport) -> String {
    format!("{}/{}.html", STATS_DIR, report.name.stem)
}

/// Render one page per report plus `index.html` into `out_dir`.
///
/// `reports` is expected newest first, as returned by
/// [`collect_reports`](super::collect_reports); the index keeps that order
/// and opens the first report in its frame.
pub fn render_site(reports: &[DatasetReport], out_dir: &Path) -> ReportResult<SiteOutput> {
    let handlebars = registry()?;
    let stats_dir = out_dir.join(STATS_DIR);
    fs::create_dir_all(&stats_dir)?;

    let mut pages = Vec::with_capacity(reports.len());
    for report in reports {
        let html = handlebars.render("stats", &StatsPage::new(report))?;
        let path = stats_dir.join(format!("{}.html", report.name.stem));
        fs::write(&path, html)?;
        log_info(format!("📄 {}", path.display()));
        pages.push(path);
    }

    let index = IndexPage {
        reports: reports
            .iter()
            .map(|r| IndexEntry {
                period: r.name.display_date(),
                href: page_href(r),
                doi: r.citation.as_ref().map(|c| c.doi.as_str()),
            })
            .collect(),
        latest: reports.first().map(page_href),
        generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
    };
    let index_path = out_dir.join("index.html");
    fs::write(&index_path, handlebars.render("index", &index)?)?;

    log_success(format!(
        "Report site written to {} ({} page(s))",
        out_dir.display(),
        pages.len()
    ));
    Ok(SiteOutput {
        index: index_path,
        pages,
    })
}
