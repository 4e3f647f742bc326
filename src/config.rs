//! Configuration file parser for ~/.config/provenance-feed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings. Base URLs can
//! be overridden from the environment, which wins over the file.
use crate::provenance::LinkStyle;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PROVENANCE_BASE_URL: &str = "http://127.0.0.1:8010";

/// Overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "PROVENANCE_FEED_API_BASE_URL";
/// Overrides `provenance_base_url`.
pub const PROVENANCE_BASE_URL_ENV: &str = "PROVENANCE_GRAPH_BASE_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid {field}: '{value}' is not an http(s) URL")]
    InvalidUrl { field: &'static str, value: String },
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level configuration. Any subset of keys may be given.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feed API.
    pub api_base_url: String,

    /// Base URL of the provenance service (badges and provenance views).
    pub provenance_base_url: String,

    /// Number of items requested per load.
    pub feed_limit: usize,

    /// Shape of item-level provenance links.
    pub link_style: LinkStyle,

    /// Transport-level timeout for every request. Unset means none.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provenance_base_url: DEFAULT_PROVENANCE_BASE_URL.to_string(),
            feed_limit: crate::app::DEFAULT_FEED_LIMIT,
            link_style: LinkStyle::default(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "api_base_url",
        "provenance_base_url",
        "feed_limit",
        "link_style",
        "request_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            api_base_url = %config.api_base_url,
            provenance_base_url = %config.provenance_base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are
    /// ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(API_BASE_URL_ENV) {
            tracing::debug!(url = %url, "Feed API base URL from environment");
            self.api_base_url = url;
        }
        if let Some(url) = get(PROVENANCE_BASE_URL_ENV) {
            tracing::debug!(url = %url, "Provenance base URL from environment");
            self.provenance_base_url = url;
        }
        self
    }

    pub fn api_base(&self) -> Result<Url, ConfigError> {
        parse_base("api_base_url", &self.api_base_url)
    }

    pub fn provenance_base(&self) -> Result<Url, ConfigError> {
        parse_base("provenance_base_url", &self.provenance_base_url)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_base(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    };
    let url = Url::parse(value.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(invalid()),
    }
}

// ============================================================================
// Tests
// ============================================================================
