use arrow::{
    array::{Array, ArrayRef, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::PipelineError,
    process::{trimming::apply_trimming, utils::scrub_text},
    table::{KEY_COLUMNS, NOT_PROVIDED, ZIP_DEFAULT},
};

const ZIP_POS: usize = 3;

/// Clean one raw source table.
///
/// The first four columns are renamed to `name`, `address`, `city`, `zip` by
/// position, whatever their headers say; later columns keep their names and
/// only get whitespace-trimmed. Row count and order never change.
#[tracing::instrument(level = "debug", skip(batch), fields(rows = batch.num_rows()))]
pub fn normalize(batch: &RecordBatch, source: &str) -> Result<RecordBatch, PipelineError> {
    let original_count = batch.num_rows();
    debug!(original_count, "input rows");

    if batch.num_columns() < KEY_COLUMNS.len() {
        return Err(PipelineError::MissingColumns {
            source_name: source.to_string(),
            found: batch.num_columns(),
        });
    }

    debug!("renaming columns, filling missing values, lowercasing");
    let renamed = rename_and_fill(batch)?;

    debug!("removing whitespace");
    let trimmed = apply_trimming(&renamed)?;

    debug!("removing corporate suffixes and symbols");
    let cleaned = scrub_columns(&trimmed)?;

    debug!(cleaned_count = cleaned.num_rows(), "cleaned rows");
    check_row_count(source, original_count, cleaned.num_rows())?;

    Ok(cleaned)
}

/// Rows must survive cleaning one-for-one.
pub fn check_row_count(source: &str, before: usize, after: usize) -> Result<(), PipelineError> {
    if before != after {
        return Err(PipelineError::Integrity {
            source_name: source.to_string(),
            before,
            after,
        });
    }
    Ok(())
}

/// Positional rename, then null filling; text columns are also lowercased.
fn rename_and_fill(batch: &RecordBatch) -> Result<RecordBatch, PipelineError> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut cols = Vec::with_capacity(batch.num_columns());

    for (i, (field, arr)) in schema.fields().iter().zip(batch.columns()).enumerate() {
        if i >= KEY_COLUMNS.len() {
            fields.push(field.as_ref().clone());
            cols.push(arr.clone());
            continue;
        }

        let utf8 = cast(arr.as_ref(), &DataType::Utf8)?;
        let sarr = as_strings(&utf8)?;
        let filled: StringArray = if i == ZIP_POS {
            sarr.iter()
                .map(|v| Some(v.unwrap_or(ZIP_DEFAULT).to_string()))
                .collect()
        } else {
            sarr.iter()
                .map(|v| Some(v.unwrap_or(NOT_PROVIDED).to_lowercase()))
                .collect()
        };

        fields.push(Field::new(KEY_COLUMNS[i], DataType::Utf8, false));
        cols.push(Arc::new(filled) as ArrayRef);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), cols)?)
}

/// Suffix stripping on `name`, symbol stripping on `name`/`address`/`city`.
fn scrub_columns(batch: &RecordBatch) -> Result<RecordBatch, PipelineError> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for (i, arr) in batch.columns().iter().enumerate() {
        if i >= ZIP_POS {
            cols.push(arr.clone());
            continue;
        }
        let sarr = as_strings(arr)?;
        let scrubbed: StringArray = sarr
            .iter()
            .map(|v| v.map(|s| scrub_text(s, i == 0)))
            .collect();
        cols.push(Arc::new(scrubbed) as ArrayRef);
    }

    Ok(RecordBatch::try_new(batch.schema(), cols)?)
}

fn as_strings(arr: &ArrayRef) -> Result<&StringArray, PipelineError> {
    arr.as_any().downcast_ref::<StringArray>().ok_or_else(|| {
        PipelineError::Arrow(arrow::error::ArrowError::CastError(format!(
            "expected Utf8, got {}",
            arr.data_type()
        )))
    })
}
