use arrow::error::ArrowError;
use thiserror::Error;

/// Failures raised by the normalize / dedup / merge core.
///
/// File I/O is not represented here: readers and writers report through
/// `anyhow` and those errors reach the caller untouched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source '{source_name}': row count changed during normalization ({before} -> {after})")]
    Integrity {
        source_name: String,
        before: usize,
        after: usize,
    },
    #[error("source '{source_name}' has {found} columns, need at least 4 (name, address, city, zip)")]
    MissingColumns { source_name: String, found: usize },
    #[error("table has no column '{column}'")]
    MissingColumn { column: String },
    #[error("source '{source_name}' is not one of the known sources")]
    UnknownSource { source_name: String },
    #[error("source '{source_name}' is listed more than once")]
    DuplicateSource { source_name: String },
    #[error("no source tables to merge")]
    NoSources,
    #[error("cannot merge tables with different schemas: expected [{expected}], found [{found}]")]
    SchemaMismatch { expected: String, found: String },
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
