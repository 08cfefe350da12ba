use std::convert::Infallible;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use clap::Args;

use crate::package::indexes::pypi::DEFAULT_BASE_URL;

/// Default cache lifetime in hours
pub const DEFAULT_CACHE_TTL_HOURS: u32 = 24;

/// Default bound on a single request to the package index, in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Directory holding the default cache database and the JSON log
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Cache database used when `Settings::db` is not given
pub fn db_path() -> PathBuf {
    data_dir().join("packages.db")
}

pub fn log_path() -> PathBuf {
    data_dir().join("pypi-pulse.log")
}

/// `$XDG_DATA_HOME/pypi-pulse`, then `~/.local/share/pypi-pulse`, then `./pypi-pulse`
fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pypi-pulse")
}

/// Where the package cache lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// Private to the process, gone on exit
    Memory,
    File(PathBuf),
}

impl FromStr for DbLocation {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "memory" | ":memory:" => DbLocation::Memory,
            path => DbLocation::File(PathBuf::from(path)),
        })
    }
}

/// Settings shared by every command, from flags or `PYPI_PULSE_*` variables
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Cache database: `memory` or a file path [default: <data dir>/packages.db]
    #[arg(long, env = "PYPI_PULSE_DB")]
    pub db: Option<DbLocation>,

    /// Base URL of the package index
    #[arg(long, env = "PYPI_PULSE_INDEX_URL", default_value = DEFAULT_BASE_URL)]
    pub index_url: String,

    /// Hours a cached package is served before it is fetched again
    #[arg(long, env = "PYPI_PULSE_CACHE_TTL_HOURS", default_value_t = DEFAULT_CACHE_TTL_HOURS)]
    pub cache_ttl_hours: u32,

    /// Timeout of one request to the package index, in seconds
    #[arg(
        long,
        env = "PYPI_PULSE_UPSTREAM_TIMEOUT_SECS",
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS
    )]
    pub upstream_timeout_secs: u64,
}

impl Settings {
    pub fn db_location(&self) -> DbLocation {
        self.db.clone().unwrap_or_else(|| DbLocation::File(db_path()))
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.cache_ttl_hours))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Address the HTTP server listens on
#[derive(Debug, Clone, Args)]
pub struct ServeSettings {
    #[arg(long, env = "PYPI_PULSE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PYPI_PULSE_PORT", default_value_t = 8000)]
    pub port: u16,
}
