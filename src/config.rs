//! Layered settings: built-in defaults, an optional TOML file, then `WX_*`
//! environment variables (`WX_DATABASE__URL`, `WX_INGEST__MAX_WORKERS`, ...).

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_BATCH_SIZE, DEFAULT_BUSY_TIMEOUT_SECS,
    DEFAULT_DATABASE_URL, DEFAULT_FILE_EXTENSION, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

pub const ENV_PREFIX: &str = "WX";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub database: DatabaseSettings,

    #[validate(nested)]
    pub ingest: IngestSettings,

    #[validate(nested)]
    pub retry: RetrySettings,

    pub statistics: StatisticsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub url: String,

    /// Defaults to the ingest worker count
    #[validate(range(min = 1))]
    pub max_connections: Option<u32>,

    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,

    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IngestSettings {
    #[validate(length(min = 1))]
    pub file_extension: String,

    #[validate(range(min = 1, max = 256))]
    pub max_workers: usize,

    #[validate(range(min = 1, max = 6000))]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetrySettings {
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    pub base_delay_ms: u64,

    #[validate(range(min = 1))]
    pub operation_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    pub conflict_policy: ConflictPolicy,
}

/// What to do when a (station, year) statistic already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Keep the existing row and discard the new computation
    #[default]
    Skip,
    /// Overwrite the existing row with the new computation
    Refresh,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: None,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            max_workers: num_cpus::get(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_DELAY_MS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load from an optional file and the environment, then validate.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_with(config_file, environment())
    }

    fn load_with(config_file: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Connection pool size, at least one connection per ingest worker
    pub fn pool_size(&self) -> u32 {
        let workers = u32::try_from(self.ingest.max_workers).unwrap_or(u32::MAX);
        self.database
            .max_connections
            .map_or(workers, |configured| configured.max(workers))
    }
}

// `WX_` then `__` between nested keys: WX_DATABASE__URL -> database.url
fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}
