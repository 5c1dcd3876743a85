use anyhow::Result;
use recmerge::{process, Config};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recmerge=info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) config: CLI arg, then RECMERGE_CONFIG, then defaults ────
    let config = Config::load(env::args_os().nth(1).map(PathBuf::from))?;
    info!(
        sources = config.sources.len(),
        output = %config.output.display(),
        "config loaded"
    );

    // ─── 3) read → clean → dedup → merge → write ─────────────────────
    let summary = process::run(&config)?;
    for s in &summary.sources {
        info!(
            source = %s.name,
            rows = s.input_rows,
            unique = s.unique_rows,
            duplicates = s.duplicates(),
            "source summary"
        );
    }

    info!(
        rows = summary.output_rows,
        path = %summary.output.display(),
        "all done"
    );
    Ok(())
}
