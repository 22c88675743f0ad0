mod file_config;

pub use file_config::FileConfig;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Parser)]
#[command(version)]
pub struct CliConfig {
    /// Directory holding directory.db and jobs.db
    #[arg(long, default_value = ".")]
    pub db_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between job dispatcher polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Optional TOML config file, its values take precedence over flags
    #[arg(long)]
    pub config_file: Option<PathBuf>,
}

/// Fully resolved runtime configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub poll_interval_secs: u64,
}

impl AppConfig {
    pub fn resolve(cli: CliConfig) -> Result<AppConfig> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(AppConfig {
            db_dir: file.db_dir.unwrap_or(cli.db_dir),
            port: file.port.unwrap_or(cli.port),
            poll_interval_secs: file.poll_interval_secs.unwrap_or(cli.poll_interval_secs),
        })
    }

    pub fn directory_db_path(&self) -> PathBuf {
        self.db_dir.join("directory.db")
    }

    pub fn jobs_db_path(&self) -> PathBuf {
        self.db_dir.join("jobs.db")
    }
}
