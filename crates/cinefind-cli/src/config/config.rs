//! `AppConfig` struct and TOML read/write.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use cinefind_search::DEFAULT_LANGUAGE;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// TMDB connection settings.
    #[serde(default)]
    pub tmdb: TmdbConfig,
}

/// `[tmdb]` section.
#[derive(Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TmdbConfig {
    /// Response language (IETF tag).
    pub language: String,
    /// API root override, e.g. a local mock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// v3 API key. `TMDB_API_TOKEN` / `TMDB_API_KEY` take precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-page fetch timeout in seconds.
    pub timeout_secs: u64,
    /// Minimum spacing between requests in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            language: String::from(DEFAULT_LANGUAGE),
            base_url: None,
            api_key: None,
            timeout_secs: 10,
            min_interval_ms: 25,
        }
    }
}

impl TmdbConfig {
    /// Fetch timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request spacing as a `Duration`.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("language", &self.language)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("min_interval_ms", &self.min_interval_ms)
            .finish()
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }
}
