use arrow::{
    array::{ArrayRef, StringArray},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Trim leading/trailing whitespace in every Utf8 column; other columns pass through.
pub fn apply_trimming(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for arr in batch.columns() {
        if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
            let trimmed: StringArray = sarr.iter().map(|opt| opt.map(str::trim)).collect();
            cols.push(Arc::new(trimmed) as ArrayRef);
            continue;
        }
        cols.push(arr.clone());
    }

    RecordBatch::try_new(batch.schema(), cols)
}
