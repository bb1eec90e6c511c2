//! JSON Schema validation for registry metadata and citation files.
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `zenodo-deposit-metadata.json` - checked before a deposit is created
//! - `citation-metadata.json` - checked when loading `<stem>_metadata.json`
//!   files for the report
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use legistats::validation::validate_deposit_metadata;
//!
//! let metadata = json!({ "title": "EU Legislative Acts Statistics - May 2023" });
//! assert!(validate_deposit_metadata(&metadata).is_err()); // description missing
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static DEPOSIT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/zenodo-deposit-metadata.json"))
        .expect("Invalid embedded schema")
});

static CITATION_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/citation-metadata.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema (draft 7).
///
/// Returns every error message when invalid.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate deposit metadata before sending it to the registry.
pub fn validate_deposit_metadata(data: &Value) -> Result<(), Vec<String>> {
    validate(&DEPOSIT_SCHEMA, data)
}

/// Quick check of a citation file's content.
pub fn is_valid_citation(data: &Value) -> bool {
    is_valid(&CITATION_SCHEMA, data)
}
