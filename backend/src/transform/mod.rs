//! Transformation module.
//!
//! This module handles raw export to tidy table transformation:
//! - Normalize: row classification state machine
//! - Tidy: tidy CSV persistence
//! - Pipeline: fetch, normalize, write, publish

pub mod normalize;
pub mod pipeline;
pub mod tidy;

pub use normalize::{
    normalize, normalize_with, Diagnostics, NormalizeOptions, Normalized, NormalizerState, RowKind,
};
pub use pipeline::{run_pipeline, ParseOptions, PipelineOutcome};
pub use tidy::{read_tidy_csv, write_tidy, write_tidy_csv};
