use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder, WriterBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs,
    io::Cursor,
    path::Path,
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    config::Config,
    process::utils::{blank_as_missing, clean_str, skip_initial_space},
    table::SourceTable,
};

const BATCH_ROWS: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    /// `.parquet` selects Parquet, anything else is delimited text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

/// Read one delimited file into a single all-Utf8 batch.
///
/// The header row names the columns (trimmed). Whitespace at the start of an
/// unquoted field is dropped before parsing, so `a, "b, c"` reads as two
/// cells. A cell that is then empty becomes null, and so do the trailing cells
/// of a row shorter than the header.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_source<P: AsRef<Path>>(path: P, name: &str, delimiter: u8) -> Result<SourceTable> {
    let path = path.as_ref();
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let data = skip_initial_space(&raw, delimiter);

    let (inferred, _) = Format::default()
        .with_header(true)
        .with_delimiter(delimiter)
        .with_truncated_rows(true)
        .infer_schema(Cursor::new(&data), None)
        .with_context(|| format!("parsing {}", path.display()))?;
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(clean_str(f.name()), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    debug!(columns = schema.fields().len(), "header parsed");

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(delimiter)
        .with_truncated_rows(true)
        .with_batch_size(BATCH_ROWS)
        .build(Cursor::new(&data))
        .context("creating CSV reader")?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("CSV parse error in {}", path.display()))?;
    let batch = concat_batches(&schema, &batches).context("combining CSV batches")?;
    let batch = apply_blank_as_missing(&batch)?;

    info!(rows = batch.num_rows(), "read source");
    Ok(SourceTable::new(name, batch))
}

fn apply_blank_as_missing(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for arr in batch.columns() {
        if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
            let cells: StringArray = sarr
                .iter()
                .map(|opt| opt.and_then(blank_as_missing))
                .collect();
            cols.push(Arc::new(cells) as ArrayRef);
            continue;
        }
        cols.push(arr.clone());
    }
    RecordBatch::try_new(batch.schema(), cols).map_err(Into::into)
}

/// Every configured source, in configured order.
pub fn read_sources(config: &Config) -> Result<Vec<SourceTable>> {
    let mut tables = Vec::with_capacity(config.sources.len());
    for src in &config.sources {
        let name = src.source_name()?;
        debug!(name = %name, path = %src.path.display(), "source");
        tables.push(read_source(&src.path, &name, config.delimiter_byte())?);
    }
    Ok(tables)
}

/// Write `batch` to `path`, all or nothing.
///
/// Data goes to a temp file next to the destination, which is renamed over
/// `path` only once the whole table is written.
#[tracing::instrument(level = "info", skip(batch, path), fields(path = %path.as_ref().display(), rows = batch.num_rows()))]
pub fn write_output<P: AsRef<Path>>(batch: &RecordBatch, path: P, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;

    match OutputFormat::from_path(path) {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .with_delimiter(delimiter)
                .build(tmp.as_file_mut());
            writer.write(batch).context("writing CSV output")?;
        }
        OutputFormat::Parquet => {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props))
                .context("creating parquet writer")?;
            writer.write(batch).context("writing batch to parquet")?;
            writer.close().context("closing parquet writer")?;
        }
    }

    tmp.as_file().sync_all().context("syncing output")?;
    tmp.persist(path)
        .with_context(|| format!("renaming temp file -> {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::string_column;
    use arrow::array::{Array, BooleanArray, Int64Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn reads_header_and_skips_initial_space() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("file1.csv");
        fs::write(
            &path,
            "Company, Street, Town, Zip\nAcme LLC, 1 Main St, Springfield, 11111\n, 2 Elm Rd,   , 22222\n",
        )?;

        let table = read_source(&path, "file1", b',')?;
        assert_eq!(table.name, "file1");
        let headers: Vec<String> = table
            .batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(headers, vec!["Company", "Street", "Town", "Zip"]);

        let street = string_column(&table.batch, "Street").unwrap();
        assert_eq!(street.value(0), "1 Main St");
        let company = string_column(&table.batch, "Company").unwrap();
        assert!(company.is_null(1));
        let town = string_column(&table.batch, "Town").unwrap();
        assert!(town.is_null(1));
        let zip = string_column(&table.batch, "Zip").unwrap();
        assert_eq!(zip.value(1), "22222");
        Ok(())
    }

    #[test]
    fn quoted_field_after_space_keeps_its_delimiter() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("file1.csv");
        fs::write(
            &path,
            "name, address, city, zip\nAcme, \"1 Main St, Suite 2\", Springfield, 11111\n",
        )?;

        let table = read_source(&path, "file1", b',')?;
        assert_eq!(table.batch.num_rows(), 1);
        assert_eq!(table.batch.num_columns(), 4);
        let address = string_column(&table.batch, "address").unwrap();
        assert_eq!(address.value(0), "1 Main St, Suite 2");
        let zip = string_column(&table.batch, "zip").unwrap();
        assert_eq!(zip.value(0), "11111");
        Ok(())
    }

    #[test]
    fn short_rows_read_as_missing_cells() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("file2.csv");
        fs::write(
            &path,
            "name,address,city,zip\nAcme,1 Main St,Springfield\nGlobex,2 Elm Rd,Ogdenville,22222\n",
        )?;

        let table = read_source(&path, "file2", b',')?;
        assert_eq!(table.batch.num_rows(), 2);
        let zip = string_column(&table.batch, "zip").unwrap();
        assert!(zip.is_null(0));
        assert_eq!(zip.value(1), "22222");

        let cleaned = crate::process::normalize::normalize(&table.batch, "file2")?;
        let zip = string_column(&cleaned, "zip").unwrap();
        assert_eq!(zip.value(0), "0");
        Ok(())
    }

    #[test]
    fn header_only_file_gives_empty_table() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("file2.csv");
        fs::write(&path, "name,address,city,zip\n")?;
        let table = read_source(&path, "file2", b',')?;
        assert_eq!(table.batch.num_rows(), 0);
        assert_eq!(table.batch.num_columns(), 4);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_source("/definitely/not/here.csv", "x", b',').unwrap_err();
        assert!(format!("{:#}", err).contains("here.csv"));
    }

    fn sample_output() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("occurrences", DataType::Int64, false),
            Field::new("file1", DataType::Boolean, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["abc", "def"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["acme", "globex"])),
                Arc::new(Int64Array::from(vec![2, 1])),
                Arc::new(BooleanArray::from(vec![true, false])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_csv_with_header_and_no_index() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("output.csv");
        write_output(&sample_output(), &path, b',')?;

        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name,occurrences,file1");
        assert_eq!(lines[1], "abc,acme,2,true");
        assert_eq!(lines[2], "def,globex,1,false");
        assert_eq!(lines.len(), 3);
        Ok(())
    }

    #[test]
    fn writes_parquet_by_extension() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("output.parquet");
        let batch = sample_output();
        write_output(&batch, &path, b',')?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let read: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].num_rows(), 2);
        assert_eq!(read[0].column(1).as_ref(), batch.column(1).as_ref());
        Ok(())
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.PARQUET")), OutputFormat::Parquet);
        assert_eq!(OutputFormat::from_path(Path::new("a/b.csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Csv);
    }

    #[test]
    fn leaves_only_the_output_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("output.csv");
        write_output(&sample_output(), &path, b',')?;
        let entries: Vec<_> = fs::read_dir(dir.path())?.collect::<std::io::Result<_>>()?;
        assert_eq!(entries.len(), 1);
        Ok(())
    }
}
