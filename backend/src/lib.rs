//! # Legistats - EU legislative act statistics as tidy data
//!
//! Legistats turns the monthly EUR-Lex "legal acts statistics" export, a
//! loosely structured spreadsheet, into a tidy table with one count per
//! row, optionally mints a DOI for it, attaches it to a release, and
//! renders a static report site over all published tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Raw export  │────▶│   Parser    │────▶│  Normalize  │────▶│  Tidy CSV   │
//! │ (path/URL)  │     │  (auto-enc) │     │ (row state) │     │ (one count) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                          ┌──────────────────┬──────────────────────┤
//!                          ▼                  ▼                      ▼
//!                   ┌─────────────┐    ┌─────────────┐        ┌─────────────┐
//!                   │ Zenodo DOI  │    │  GitHub     │        │ HTML report │
//!                   │ + citation  │    │  release    │        │ (stats site)│
//!                   └─────────────┘    └─────────────┘        └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use legistats::{run_pipeline, ParseOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = run_pipeline(ParseOptions::new("export.csv", "legislative_acts_2023_05.csv"))
//!         .await
//!         .unwrap();
//!     println!("Wrote {} records", outcome.records);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (RawRow, Period, TidyRecord, Citation)
//! - [`parser`] - Raw export reading with auto-detection
//! - [`transform`] - Normalizer, tidy persistence and pipeline
//! - [`publish`] - Zenodo deposits and GitHub releases
//! - [`report`] - Aggregation and static HTML rendering
//! - [`validation`] - Metadata schema validation
//! - [`config`] - Publisher configuration
//! - [`logs`] - Leveled log helpers

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Publishing
pub mod config;
pub mod publish;

// Reporting
pub mod report;

// Validation
pub mod validation;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{PipelineError, PublishError, ReportError, SourceError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Citation, CountKind, DatasetName, Period, RawRow, TidyRecord};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, fetch_source, format_delimiter,
    parse_source_bytes, parse_source_bytes_with, read_raw_rows, RawTable, Source,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    normalize, normalize_with, run_pipeline, Diagnostics, NormalizeOptions, Normalized,
    ParseOptions, PipelineOutcome,
};

// =============================================================================
// Re-exports - Publishing
// =============================================================================

pub use config::{GitHubConfig, ZenodoConfig};
pub use publish::{GitHubPublisher, ZenodoPublisher};

// =============================================================================
// Re-exports - Reporting
// =============================================================================

pub use report::{collect_reports, render_site, DatasetReport};
