pub mod dedup;
pub mod merge;
pub mod normalize;
pub mod trimming;
pub mod utils;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use std::{collections::HashSet, path::PathBuf};
use tracing::{debug, info};

use crate::{config::Config, error::PipelineError, io, table::SourceTable};

/// Row counts for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub name: String,
    pub input_rows: usize,
    pub unique_rows: usize,
}

impl SourceStats {
    pub fn duplicates(&self) -> usize {
        self.input_rows - self.unique_rows
    }
}

/// Result of the in-memory stages.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: RecordBatch,
    pub sources: Vec<SourceStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: Vec<SourceStats>,
    pub output_rows: usize,
    pub output: PathBuf,
}

/// Normalize and deduplicate each source in the order given, then merge.
///
/// The source order is also the order of the indicator columns and decides
/// which row comes first when two rows share a name. Any failure aborts the
/// whole run.
#[tracing::instrument(level = "info", skip(sources), fields(sources = sources.len()))]
pub fn run_pipeline(sources: Vec<SourceTable>) -> Result<PipelineOutput, PipelineError> {
    let mut seen = HashSet::new();
    for src in &sources {
        if !seen.insert(src.name.as_str()) {
            return Err(PipelineError::DuplicateSource {
                source_name: src.name.clone(),
            });
        }
    }
    let known: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();

    let mut deduped = Vec::with_capacity(sources.len());
    let mut stats = Vec::with_capacity(sources.len());
    for SourceTable { name, batch } in sources {
        info!(source = %name, "cleaning");
        let clean = normalize::normalize(&batch, &name)?;
        drop(batch);

        info!(source = %name, "deduplicating");
        let unique = dedup::deduplicate(&clean, &name, &known)?;

        let s = SourceStats {
            name,
            input_rows: clean.num_rows(),
            unique_rows: unique.num_rows(),
        };
        debug!(
            source = %s.name,
            input_rows = s.input_rows,
            unique_rows = s.unique_rows,
            duplicates = s.duplicates(),
            "source done"
        );
        stats.push(s);
        deduped.push(unique);
    }

    info!("combining cleaned and deduplicated tables");
    let table = merge::merge(&deduped)?;

    Ok(PipelineOutput {
        table,
        sources: stats,
    })
}

/// Read every configured source, run the pipeline, write the output file.
pub fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;

    info!("reading source files");
    let sources = io::read_sources(config)?;

    let out = run_pipeline(sources).context("processing sources")?;

    info!(path = %config.output.display(), "writing output");
    io::write_output(&out.table, &config.output, config.delimiter_byte())?;

    Ok(RunSummary {
        output_rows: out.table.num_rows(),
        sources: out.sources,
        output: config.output.clone(),
    })
}
