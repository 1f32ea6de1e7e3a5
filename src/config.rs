use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::version::semver::PrereleaseOrdering;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default refresh interval in milliseconds (1 hour)
pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Default base URL for npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Application configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub registry: RegistryConfig,
    pub display: DisplayConfig,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache refresh interval in milliseconds
    pub refresh_interval: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

/// Upstream registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

/// How reconciled rows are presented
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Tag names hidden from every listing
    pub excluded_tags: Vec<String>,
    pub prerelease_ordering: PrereleaseOrdering,
}

impl AppConfig {
    /// Load configuration from a JSON file, using defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file {:?}", path));
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }
}

/// Returns the path to the data directory for dist-tags.
/// Uses $XDG_DATA_HOME/dist-tags if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/dist-tags,
/// or ./dist-tags if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("dist-tags.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("dist-tags.log")
}

/// Returns the path to the configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("dist-tags")
}
