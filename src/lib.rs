pub mod config;
pub mod error;
pub mod hash;
pub mod io;
pub mod process;
pub mod table;

pub use config::{Config, SourceConfig};
pub use error::PipelineError;
pub use process::{run, run_pipeline, RunSummary};
pub use table::SourceTable;
