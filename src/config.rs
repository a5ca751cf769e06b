//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::load_or_default`]) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::cache::aside::DEFAULT_MIN_BATCH_SIZE;
use crate::{HuginnError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    /// Entry cap per shard (default: 50).
    #[serde(default = "default_max_entries_per_shard")]
    pub max_entries_per_shard: usize,
    /// Entry time-to-live in seconds (default: 300).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Number of shards (default: 16).
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
    /// Seconds between reaper sweeps (default: 60).
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries_per_shard: default_max_entries_per_shard(),
            ttl_secs: default_ttl_secs(),
            shard_count: default_shard_count(),
            reaper_interval_secs: default_reaper_interval_secs(),
        }
    }
}

fn default_max_entries_per_shard() -> usize {
    50
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_shard_count() -> usize {
    16
}

fn default_reaper_interval_secs() -> u64 {
    60
}

impl From<CacheSection> for CacheConfig {
    fn from(section: CacheSection) -> Self {
        CacheConfig::new()
            .max_entries_per_shard(section.max_entries_per_shard)
            .ttl(Duration::from_secs(section.ttl_secs))
            .shard_count(section.shard_count)
            .reaper_interval(Duration::from_secs(section.reaper_interval_secs))
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewaySection {
    /// Batches shorter than this skip the cache (default: 10).
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,
    /// Cap on patterns returned per batch; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_patterns: Option<usize>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            min_batch_size: default_min_batch_size(),
            max_patterns: None,
        }
    }
}

fn default_min_batch_size() -> usize {
    DEFAULT_MIN_BATCH_SIZE
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            HuginnError::Configuration(
                "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but returns defaults when no path was
    /// given and no standard file exists. An explicit path must exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a config file and validate the cache settings.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.cache_config().validate()?;
        Ok(config)
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.clone().into()
    }

    /// Resolve the config file path; `Ok(None)` if no standard file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
