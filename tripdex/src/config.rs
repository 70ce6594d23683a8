//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is
//! a valid configuration. Environment variables override the file: top-level
//! keys as `TRIPDEX_POOL_SIZE`, nested ones as `TRIPDEX_SYNC__DIRTY_BATCH_SIZE`.

use crate::search::{SearchOptions, DEFAULT_LIMIT, DEFAULT_MIN_SCORE, MAX_LIMIT};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "TRIPDEX";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripdexConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub pool_size: u32,

    pub search: SearchConfig,

    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count when the caller gives none (or a non-positive one)
    pub default_limit: usize,
    /// Hard cap on returned results
    pub max_limit: usize,
    /// Matches scoring below this are dropped
    pub min_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Dirty entries read per non-exhaustive drain
    pub dirty_batch_size: usize,
}

impl Default for TripdexConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tripdex.sqlite3"),
            pool_size: 8,
            search: SearchConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { dirty_batch_size: 100 }
    }
}

impl SearchConfig {
    /// Query options for one call
    pub fn options(&self, limit: Option<i64>) -> SearchOptions {
        SearchOptions {
            limit,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            min_score: self.min_score,
        }
    }
}

/// `TRIPDEX_*` variables, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl TripdexConfig {
    /// File (when given) plus process environment, validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".into()));
        }
        if self.sync.dirty_batch_size == 0 {
            return Err(ConfigError::Invalid("sync.dirty_batch_size must be at least 1".into()));
        }
        if self.search.max_limit == 0 {
            return Err(ConfigError::Invalid("search.max_limit must be at least 1".into()));
        }
        if !self.search.min_score.is_finite() || self.search.min_score <= 0.0 {
            return Err(ConfigError::Invalid("search.min_score must be a positive number".into()));
        }
        Ok(())
    }
}
