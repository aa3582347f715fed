//! Configuration management for sleuthd.
//!
//! Loads settings from /etc/sleuth/config.toml or uses defaults. Every field
//! has a serde default, so a partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sleuth_shared::phase::DEFAULT_MAX_RETRIES;
use sleuth_shared::safety::SafetyPolicy;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/sleuth/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/sleuth/config.toml";

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries before the least recently used one is evicted
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Minimum cosine similarity for a semantic hit
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Background expiry sweep period; 0 disables the sweep
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_entries() -> usize {
    200
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            similarity_threshold: default_similarity_threshold(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Query coalescer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalescerConfig {
    /// How long a published result stays visible to late arrivals
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

fn default_grace_ms() -> u64 {
    100
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
        }
    }
}

impl CoalescerConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Investigation session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationConfig {
    /// Retries before a session's evidence is discarded
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleuthConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub coalescer: CoalescerConfig,

    #[serde(default)]
    pub safety: SafetyPolicy,

    #[serde(default)]
    pub investigation: InvestigationConfig,
}

impl SleuthConfig {
    /// Load from the default locations, falling back to defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {:#}", e);
                SleuthConfig::default()
            })
    }

    /// Load an explicit path when given; a missing explicit file is an error
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Ok(Self::load()),
        }
    }

    /// Load from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SleuthConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
