use arrow::{
    array::{ArrayRef, UInt32Array},
    compute::{concat_batches, take},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::PipelineError,
    hash::row_ids,
    table::{describe_schema, string_column, ID, NAME},
};

/// Stack per-source tables in the order given, stable-sort by name and
/// prepend a content-derived `id`.
///
/// Rows are not re-grouped across sources: the same record seen in two
/// sources stays as two rows with different indicator flags.
#[tracing::instrument(level = "debug", skip(batches), fields(tables = batches.len()))]
pub fn merge(batches: &[RecordBatch]) -> Result<RecordBatch, PipelineError> {
    let first = batches.first().ok_or(PipelineError::NoSources)?;
    let schema = first.schema();
    for b in &batches[1..] {
        if b.schema() != schema {
            return Err(PipelineError::SchemaMismatch {
                expected: describe_schema(&schema),
                found: describe_schema(&b.schema()),
            });
        }
    }

    debug!("combining tables");
    let combined = concat_batches(&schema, batches)?;

    debug!(rows = combined.num_rows(), "sorting by name");
    let sorted = sort_by_name(&combined)?;

    debug!("generating ids");
    let ids = row_ids(sorted.columns(), sorted.num_rows())?;

    let mut fields = vec![Arc::new(Field::new(ID, DataType::Utf8, false))];
    fields.extend(schema.fields().iter().cloned());
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(sorted.num_columns() + 1);
    cols.push(Arc::new(ids));
    cols.extend(sorted.columns().iter().cloned());

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), cols)?)
}

/// Stable: rows with equal names keep their concatenation order.
fn sort_by_name(batch: &RecordBatch) -> Result<RecordBatch, PipelineError> {
    let names = string_column(batch, NAME)?;
    let mut order: Vec<u32> = (0..batch.num_rows() as u32).collect();
    order.sort_by(|&a, &b| names.value(a as usize).cmp(names.value(b as usize)));
    let indices = UInt32Array::from(order);

    let cols = batch
        .columns()
        .iter()
        .map(|c| take(c.as_ref(), &indices, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(batch.schema(), cols)?)
}
