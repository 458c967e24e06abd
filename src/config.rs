use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::platform;
use crate::report::Ranking;
use crate::scan::DEFAULT_BATCH_SIZE;

pub const DEFAULT_LIST_SIZE: usize = 25;

/// Optional settings from `config.toml`. Anything set on the command line wins.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub list: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| Error::Config {
            details: format!("{}: {e}", path.display()),
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

pub struct Config {
    pub roots: Vec<PathBuf>,
    pub db_path: PathBuf,
    pub batch_size: usize,
    pub list_size: usize,
    pub rankings: Vec<Ranking>,
    pub scan: bool,
    pub json_output: bool,
}

impl Config {
    /// Merge the command line with the config file (explicit `--config`, or
    /// the default location if it exists).
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => match platform::config_file_path() {
                Some(path) if path.exists() => FileConfig::load(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::merge(cli, file, platform::default_store_path())
    }

    fn merge(cli: &Cli, file: FileConfig, default_db: Option<PathBuf>) -> Result<Self> {
        let db_path = cli
            .db
            .clone()
            .or(file.db_path)
            .or(default_db)
            .ok_or_else(|| Error::Config {
                details: "could not determine home directory, pass --db".to_string(),
            })?;

        let batch_size = cli
            .batch_size
            .or(file.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::Config {
                details: "batch size must be at least 1".to_string(),
            });
        }

        Ok(Config {
            roots: cli.roots.clone(),
            db_path,
            batch_size,
            list_size: cli.list.or(file.list).unwrap_or(DEFAULT_LIST_SIZE),
            rankings: cli.rankings(),
            scan: !cli.no_scan,
            json_output: cli.json,
        })
    }
}
