//! Error types for the legistats pipeline.
//!
//! - [`SourceError`] - structural failures reading the raw export
//! - [`PublishError`] - registry and release API failures
//! - [`ReportError`] - report assembly failures
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Malformed cells and unrecognized rows are not errors at all: the
//! normalizer recovers from them locally and only counts them.

use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Structural errors on the raw source table. Always fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read a local file.
    #[error("Failed to read source '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to download a remote source.
    #[error("Failed to fetch '{url}': {message}")]
    Http { url: String, message: String },

    /// Bytes could not be decoded to text.
    #[error("Failed to decode source: {0}")]
    Encoding(String),

    /// The CSV reader rejected the content.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The source holds no rows at all.
    #[error("Source table is empty")]
    EmptySource,
}

// =============================================================================
// Publishing Errors
// =============================================================================

/// Errors from the dataset registry or release publishers.
///
/// The pipeline catches these and keeps going: the tidy table is
/// produced regardless of what happens here.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No token configured for the service.
    #[error("Missing API token for {0}")]
    MissingToken(&'static str),

    /// Repository slug not in `owner/name` form.
    #[error("Invalid repository '{0}', expected owner/name")]
    InvalidRepository(String),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{service} API returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The API answered with an unexpected payload.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Deposit metadata did not pass schema validation.
    #[error("Invalid deposit metadata: {}", .0.join("; "))]
    InvalidMetadata(Vec<String>),

    /// Reading an attachment or writing a companion file failed.
    #[error("Publish IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Publish JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors while assembling the static report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error.
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A tidy table could not be read.
    #[error("Failed to read tidy table '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Template failed to compile.
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// Template failed to render.
    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors returned by [`crate::transform::pipeline::run_pipeline`]
/// and the CLI commands.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Publishing error (only surfaces from publish-only commands).
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Report error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Failed writing the tidy table.
    #[error("Failed to write '{path}': {message}")]
    Output { path: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for publishing operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let source_err = SourceError::EmptySource;
        let pipeline_err: PipelineError = source_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let publish_err = PublishError::MissingToken("Zenodo");
        let pipeline_err: PipelineError = publish_err.into();
        assert!(pipeline_err.to_string().contains("Zenodo"));
    }

    #[test]
    fn test_api_error_format() {
        let err = PublishError::Api {
            service: "GitHub",
            status: 422,
            body: "already_exists".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("GitHub"));
        assert!(msg.contains("422"));
        assert!(msg.contains("already_exists"));
    }

    #[test]
    fn test_invalid_metadata_lists_all_errors() {
        let err = PublishError::InvalidMetadata(vec!["title missing".into(), "bad license".into()]);
        assert_eq!(
            err.to_string(),
            "Invalid deposit metadata: title missing; bad license"
        );
    }
}
