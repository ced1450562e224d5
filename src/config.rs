//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default validity window: one hour.
pub const DEFAULT_TTL: u64 = 60 * 60;

/// Default directory records are written under.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one record per key
    pub cache_dir: PathBuf,
    /// Validity window in seconds for lookups without an explicit override
    pub default_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILE_CACHE_DIR` - Storage root (default: `cache`)
    /// - `FILE_CACHE_TTL` - Validity window in seconds (default: 3600)
    pub fn from_env() -> Self {
        Self {
            cache_dir: env::var("FILE_CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            default_ttl: env::var("FILE_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            default_ttl: DEFAULT_TTL,
        }
    }
}
