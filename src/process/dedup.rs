use arrow::{
    array::{ArrayRef, BooleanArray, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::{
    error::PipelineError,
    table::{string_column, ADDRESS, CITY, KEY_COLUMNS, NAME, OCCURRENCES, ZIP},
};

type Key<'a> = (&'a str, &'a str, &'a str, &'a str);

/// Schema of every deduplicated table: the key columns, `occurrences`, then
/// one indicator column per known source, in the given order.
pub fn dedup_schema(known_sources: &[String]) -> SchemaRef {
    let mut fields: Vec<Field> = KEY_COLUMNS
        .iter()
        .map(|c| Field::new(*c, DataType::Utf8, false))
        .collect();
    fields.push(Field::new(OCCURRENCES, DataType::Int64, false));
    for src in known_sources {
        fields.push(Field::new(src, DataType::Boolean, false));
    }
    Arc::new(Schema::new(fields))
}

/// Collapse rows sharing (name, address, city, zip) into one row with a count,
/// then tag each row with the source it came from.
///
/// Output is ordered by `occurrences` descending, then name, address, city and
/// zip ascending. Columns outside the key do not survive.
#[tracing::instrument(level = "debug", skip(batch, known_sources), fields(rows = batch.num_rows()))]
pub fn deduplicate(
    batch: &RecordBatch,
    source: &str,
    known_sources: &[String],
) -> Result<RecordBatch, PipelineError> {
    if !known_sources.iter().any(|s| s == source) {
        return Err(PipelineError::UnknownSource {
            source_name: source.to_string(),
        });
    }

    let names = string_column(batch, NAME)?;
    let addresses = string_column(batch, ADDRESS)?;
    let cities = string_column(batch, CITY)?;
    let zips = string_column(batch, ZIP)?;

    debug!("adding occurrence count");
    let mut index: HashMap<Key<'_>, usize> = HashMap::with_capacity(batch.num_rows());
    let mut groups: Vec<(Key<'_>, i64)> = Vec::new();
    for row in 0..batch.num_rows() {
        let key = (
            names.value(row),
            addresses.value(row),
            cities.value(row),
            zips.value(row),
        );
        let next = groups.len();
        let g = *index.entry(key).or_insert(next);
        if g == next {
            groups.push((key, 0));
        }
        groups[g].1 += 1;
    }
    debug!(
        duplicates = batch.num_rows() - groups.len(),
        unique = groups.len(),
        "duplicate count"
    );

    groups.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| ka.cmp(kb)));

    debug!("adding source file columns");
    let n = groups.len();
    let mut cols: Vec<ArrayRef> = vec![
        Arc::new(groups.iter().map(|(k, _)| Some(k.0)).collect::<StringArray>()) as ArrayRef,
        Arc::new(groups.iter().map(|(k, _)| Some(k.1)).collect::<StringArray>()),
        Arc::new(groups.iter().map(|(k, _)| Some(k.2)).collect::<StringArray>()),
        Arc::new(groups.iter().map(|(k, _)| Some(k.3)).collect::<StringArray>()),
        Arc::new(groups.iter().map(|(_, c)| *c).collect::<Int64Array>()),
    ];
    for src in known_sources {
        cols.push(Arc::new(BooleanArray::from(vec![src == source; n])));
    }

    Ok(RecordBatch::try_new(dedup_schema(known_sources), cols)?)
}
