use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};

/// Env var naming a YAML config file, used when no path is passed on the command line.
pub const CONFIG_ENV: &str = "RECMERGE_CONFIG";

/// One input file. `name` becomes the source indicator column and defaults to the file stem.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    pub fn named(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
        }
    }

    /// `data/file1.csv` -> `file1`, unless a name was configured.
    pub fn source_name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cannot derive a source name from {}", self.path.display()))
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Config {
    /// Processed in this order; the order also fixes the indicator column order.
    pub sources: Vec<SourceConfig>,
    pub output: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new("data/file1.csv"),
                SourceConfig::new("data/file2.csv"),
            ],
            output: PathBuf::from("data/output.csv"),
            delimiter: default_delimiter(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(s).context("parsing config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("loading config {}", path.display()))
    }

    /// Explicit path, else `RECMERGE_CONFIG`, else built-in defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit.or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from)) {
            Some(path) => Self::from_file(path),
            None => {
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("config lists no sources");
        }
        if !self.delimiter.is_ascii() {
            bail!("delimiter {:?} is not a single byte", self.delimiter);
        }
        let mut seen = HashSet::new();
        for src in &self.sources {
            let name = src.source_name()?;
            if !seen.insert(name.clone()) {
                bail!("source name '{}' is used more than once", name);
            }
        }
        Ok(())
    }

    /// Source names in processing order.
    pub fn source_names(&self) -> Result<Vec<String>> {
        self.sources.iter().map(SourceConfig::source_name).collect()
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}
