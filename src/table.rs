use arrow::{array::StringArray, datatypes::Schema, record_batch::RecordBatch};

use crate::error::PipelineError;

pub const NAME: &str = "name";
pub const ADDRESS: &str = "address";
pub const CITY: &str = "city";
pub const ZIP: &str = "zip";
pub const OCCURRENCES: &str = "occurrences";
pub const ID: &str = "id";

/// Positional names given to the first four columns of every source.
pub const KEY_COLUMNS: [&str; 4] = [NAME, ADDRESS, CITY, ZIP];

/// Columns that get text cleaning (zip is only filled and trimmed).
pub const TEXT_COLUMNS: [&str; 3] = [NAME, ADDRESS, CITY];

pub const NOT_PROVIDED: &str = "not provided";
pub const ZIP_DEFAULT: &str = "0";

/// One source's table, tagged with the name used for its indicator column.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub batch: RecordBatch,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }
}

/// Look up a Utf8 column by name.
pub fn string_column<'a>(batch: &'a RecordBatch, column: &str) -> Result<&'a StringArray, PipelineError> {
    batch
        .column_by_name(column)
        .and_then(|arr| arr.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| PipelineError::MissingColumn {
            column: column.to_string(),
        })
}

/// "name:Utf8, zip:Utf8, ..." for error messages.
pub fn describe_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("{}:{}", f.name(), f.data_type()))
        .collect::<Vec<_>>()
        .join(", ")
}
