//! High-level pipeline API: raw export in, tidy table (and optional DOI and
//! release) out.
//!
//! # Example
//!
//! ```rust,ignore
//! use legistats::transform::pipeline::{run_pipeline, ParseOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let outcome = run_pipeline(ParseOptions::new(
//!         "https://eur-lex.europa.eu/statistics/2023/05/legislative-acts-statistics.csv",
//!         "data/legislative_acts_2023_05.csv",
//!     ))
//!     .await?;
//!
//!     println!("Wrote {} records", outcome.records);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use super::normalize::{normalize_with, Diagnostics, NormalizeOptions};
use super::tidy::write_tidy_csv;
use crate::config::{GitHubConfig, ZenodoConfig};
use crate::error::{PipelineError, PipelineResult, PublishResult};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::models::{Citation, DatasetName};
use crate::parser::{fetch_source, format_delimiter, parse_source_bytes_with, Source};
use crate::publish::{
    DepositRequest, GitHubPublisher, MetadataOverrides, ReleaseRequest, ZenodoPublisher,
};

/// Normalizer source shipped next to published datasets.
const PARSER_SOURCE: &str = include_str!("normalize.rs");

/// Options for [`run_pipeline`].
///
/// A publishing target is `None` when not requested. When requested but its
/// configuration could not be built (missing token, bad repository slug),
/// the error is carried here and reported like any other publish failure.
#[derive(Debug)]
pub struct ParseOptions {
    /// Local path or `http(s)` URL of the raw export.
    pub input: String,
    /// Tidy CSV to write.
    pub output: PathBuf,
    /// Source delimiter. Detected when `None`.
    pub delimiter: Option<char>,
    /// Add a `parsed_at` column and mention the time in deposit metadata.
    pub timestamp: bool,
    pub normalize: NormalizeOptions,
    pub zenodo: Option<PublishResult<ZenodoConfig>>,
    /// Version this deposition instead of creating a new one.
    pub deposit_id: Option<u64>,
    pub overrides: MetadataOverrides,
    pub github: Option<PublishResult<GitHubConfig>>,
    /// Defaults to `dataset-<YYYY_MM>`.
    pub release_tag: Option<String>,
}

impl ParseOptions {
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            delimiter: None,
            timestamp: false,
            normalize: NormalizeOptions::default(),
            zenodo: None,
            deposit_id: None,
            overrides: MetadataOverrides::default(),
            github: None,
            release_tag: None,
        }
    }

    fn publishing(&self) -> bool {
        self.zenodo.is_some() || self.github.is_some()
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub output: PathBuf,
    pub records: usize,
    pub encoding: String,
    pub delimiter: char,
    pub diagnostics: Diagnostics,
    /// Raw copy, parser source and citation file written next to the output.
    pub companion_files: Vec<PathBuf>,
    pub doi: Option<String>,
    pub citation: Option<Citation>,
    pub release_url: Option<String>,
    /// Publishing failures. They never fail the run.
    pub publish_errors: Vec<String>,
}

/// Fetch, normalize and write one raw export, then publish if asked to.
///
/// Only source and output failures are errors. Registry and release
/// failures are logged and collected in [`PipelineOutcome::publish_errors`].
pub async fn run_pipeline(options: ParseOptions) -> PipelineResult<PipelineOutcome> {
    // 1. Source
    let source = Source::parse(&options.input);
    log_info(format!("📖 Reading {}", source));
    let bytes = fetch_source(&source).await?;
    let table = parse_source_bytes_with(&bytes, options.delimiter)?;
    log_success(format!("Detected encoding: {}", table.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(table.delimiter)));
    log_success(format!("Read {} rows", table.rows.len()));

    // 2. Normalize
    log_info("⚙️  Normalizing...");
    let normalized = normalize_with(&table.rows, options.normalize);
    print_diagnostics(&normalized.diagnostics);

    // 3. Tidy table
    let parsed_at: Option<DateTime<Utc>> = options.timestamp.then(Utc::now);
    ensure_parent_dir(&options.output)?;
    write_tidy_csv(&options.output, &normalized.records, parsed_at).map_err(|e| {
        PipelineError::Output {
            path: options.output.display().to_string(),
            message: e.to_string(),
        }
    })?;
    log_success(format!(
        "💾 {} records written to {}",
        normalized.records.len(),
        options.output.display()
    ));

    let mut outcome = PipelineOutcome {
        output: options.output.clone(),
        records: normalized.records.len(),
        encoding: table.encoding,
        delimiter: table.delimiter,
        diagnostics: normalized.diagnostics,
        companion_files: Vec::new(),
        doi: None,
        citation: None,
        release_url: None,
        publish_errors: Vec::new(),
    };

    if !options.publishing() {
        return Ok(outcome);
    }

    // 4. Companion files
    let name = DatasetName::from_path(&options.output);
    let companions = [
        (name.raw_copy_path(), bytes.as_slice()),
        (name.parser_source_path(), PARSER_SOURCE.as_bytes()),
    ];
    for (path, content) in companions {
        match fs::write(&path, content) {
            Ok(()) => outcome.companion_files.push(path),
            Err(e) => record_failure(&mut outcome, &format!("Writing {}", path.display()), e),
        }
    }

    // 5. DOI
    if let Some(zenodo) = options.zenodo {
        let timestamp = parsed_at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        let mut request = DepositRequest::new(&options.output, name.date.clone());
        request.parsing_timestamp = timestamp;
        request.companion_files = outcome.companion_files.clone();
        request.overrides = options.overrides.clone();
        request.existing_deposit_id = options.deposit_id;

        match deposit(zenodo, &request, &name).await {
            Ok((citation, metadata_path)) => {
                outcome.doi = Some(citation.doi.clone());
                outcome.citation = Some(citation);
                outcome.companion_files.push(metadata_path);
            }
            Err(e) => record_failure(&mut outcome, "DOI generation", e),
        }
    }

    // 6. Release
    if let Some(github) = options.github {
        let mut request = ReleaseRequest::new(
            options
                .release_tag
                .clone()
                .unwrap_or_else(|| format!("dataset-{}", name.date)),
        );
        request.doi = outcome.doi.clone();
        request.assets = std::iter::once(options.output.clone())
            .chain(outcome.companion_files.iter().cloned())
            .collect();

        let result = match github {
            Ok(config) => GitHubPublisher::new(config).create_release(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(release) => outcome.release_url = Some(release.html_url),
            Err(e) => record_failure(&mut outcome, "Release", e),
        }
    }

    Ok(outcome)
}

/// Create or version the deposit, build its citation and save it next to
/// the tidy table.
async fn deposit(
    config: PublishResult<ZenodoConfig>,
    request: &DepositRequest,
    name: &DatasetName,
) -> PublishResult<(Citation, PathBuf)> {
    let publisher = ZenodoPublisher::new(config?);
    let deposition = publisher.create_or_update_deposit(request).await?;
    let citation = publisher
        .generate_citation(&deposition.doi, Some(&request.metadata()))
        .await?;

    let metadata_path = name.metadata_path();
    fs::write(&metadata_path, serde_json::to_string_pretty(&citation)?)?;
    log_success(format!("Citation metadata saved to {}", metadata_path.display()));
    Ok((citation, metadata_path))
}

fn record_failure(outcome: &mut PipelineOutcome, step: &str, error: impl std::fmt::Display) {
    let message = format!("{} failed: {}", step, error);
    log_error(&message);
    outcome.publish_errors.push(message);
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    log_success(format!(
        "{} data rows, {} period markers, {} category labels",
        diagnostics.data_rows, diagnostics.period_rows, diagnostics.category_rows
    ));
    log_info_indent(
        format!(
            "{} blank, {} subtotal, {} skipped row(s); {} Total record(s) dropped",
            diagnostics.blank_rows,
            diagnostics.subtotal_rows,
            diagnostics.skipped_rows,
            diagnostics.total_records_dropped
        ),
        1,
    );
    if diagnostics.coerced_cells > 0 {
        log_warning(format!(
            "{} count cell(s) were not numbers and were left empty",
            diagnostics.coerced_cells
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::transform::tidy::read_tidy_csv;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RAW: &str = "Statistics for,2023,05\n\
                       Regulations,,\n\
                       Council Regulation,12,3\n\
                       Total,12,3\n";

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempdir().unwrap();
        let input = dir.path().join("export.csv");
        fs::write(&input, RAW).unwrap();
        let output = dir.path().join("out").join("legislative_acts_2023_05.csv");
        (dir, input, output)
    }

    fn zenodo(server: &MockServer) -> PublishResult<ZenodoConfig> {
        ZenodoConfig::new(Some("secret".into()), false).map(|c| c.with_api_base(server.uri()))
    }

    #[tokio::test]
    async fn test_parse_only() {
        let (_dir, input, output) = fixture();
        let outcome = run_pipeline(ParseOptions::new(input.to_string_lossy(), &output))
            .await
            .unwrap();

        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.diagnostics.total_records_dropped, 2);
        assert!(outcome.companion_files.is_empty());
        assert!(outcome.publish_errors.is_empty());

        let records = read_tidy_csv(&output).unwrap();
        assert_eq!(records[0].category, "Regulations");
        assert_eq!(records[1].count, Some(3.0));
        assert!(!DatasetName::from_path(&output).raw_copy_path().exists());
    }

    #[tokio::test]
    async fn test_timestamp_column() {
        let (_dir, input, output) = fixture();
        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.timestamp = true;
        run_pipeline(options).await.unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("year,month,category,act_type,type,count,parsed_at\n"));
    }

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let err = run_pipeline(ParseOptions::new(
            dir.path().join("nope.csv").to_string_lossy(),
            dir.path().join("out.csv"),
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));
    }

    #[tokio::test]
    async fn test_registry_failure_keeps_tidy_table() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deposit/depositions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (_dir, input, output) = fixture();
        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.zenodo = Some(zenodo(&server));
        let outcome = run_pipeline(options).await.unwrap();

        assert!(output.exists());
        assert_eq!(outcome.doi, None);
        assert_eq!(outcome.publish_errors.len(), 1);
        assert!(outcome.publish_errors[0].contains("boom"));

        let name = DatasetName::from_path(&output);
        assert_eq!(fs::read_to_string(name.raw_copy_path()).unwrap(), RAW);
        assert!(fs::read_to_string(name.parser_source_path())
            .unwrap()
            .contains("pub fn normalize_with"));
        assert!(!name.metadata_path().exists());
    }

    #[tokio::test]
    async fn test_missing_credentials_are_recorded() {
        let (_dir, input, output) = fixture();
        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.zenodo = Some(Err(PublishError::MissingToken("Zenodo")));
        options.github = Some(Err(PublishError::MissingToken("GitHub")));
        let outcome = run_pipeline(options).await.unwrap();

        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.publish_errors.len(), 2);
        assert!(outcome.publish_errors[1].starts_with("Release failed"));
    }

    async fn mount_registry(server: &MockServer, uploads: u64) {
        Mock::given(method("POST"))
            .and(path("/deposit/depositions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 5,
                "links": { "bucket": format!("{}/bucket/5", server.uri()) }
            })))
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/bucket/5/.+"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(uploads)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/deposit/depositions/5/actions/publish"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "id": 5,
                "doi": "10.5281/zenodo.5"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_doi_and_citation_file() {
        let server = MockServer::start().await;
        mount_registry(&server, 3).await;

        let (_dir, input, output) = fixture();
        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.zenodo = Some(zenodo(&server));
        let outcome = run_pipeline(options).await.unwrap();

        assert!(outcome.publish_errors.is_empty());
        assert_eq!(outcome.doi.as_deref(), Some("10.5281/zenodo.5"));

        let saved: Citation = serde_json::from_str(
            &fs::read_to_string(DatasetName::from_path(&output).metadata_path()).unwrap(),
        )
        .unwrap();
        assert_eq!(Some(saved), outcome.citation);
    }

    #[tokio::test]
    async fn test_unwritable_companion_is_not_fatal() {
        let server = MockServer::start().await;
        mount_registry(&server, 2).await;

        let (_dir, input, output) = fixture();
        let name = DatasetName::from_path(&output);
        fs::create_dir_all(name.raw_copy_path()).unwrap();

        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.zenodo = Some(zenodo(&server));
        let outcome = run_pipeline(options).await.unwrap();

        assert!(output.exists());
        assert_eq!(outcome.publish_errors.len(), 1);
        assert!(outcome.publish_errors[0].contains("_raw.csv"));
        assert!(!outcome.companion_files.contains(&name.raw_copy_path()));
        assert!(outcome.companion_files.contains(&name.parser_source_path()));
        assert_eq!(outcome.doi.as_deref(), Some("10.5281/zenodo.5"));
    }

    #[tokio::test]
    async fn test_explicit_delimiter() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("export.csv");
        fs::write(&input, "Statistics for|2023|05\nRegulations\nCouncil Regulation|12|3\n").unwrap();
        let output = dir.path().join("legislative_acts_2023_05.csv");

        let mut options = ParseOptions::new(input.to_string_lossy(), &output);
        options.delimiter = Some('|');
        let outcome = run_pipeline(options).await.unwrap();

        assert_eq!(outcome.delimiter, '|');
        assert_eq!(outcome.records, 2);
    }
}
