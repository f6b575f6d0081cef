//! Configuration loading, validation, and management for ResGenie.
//!
//! Loads configuration from `~/.resgenie/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use resgenie_core::MissingWeekPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.resgenie/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider used for query extraction
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used for query extraction
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for extraction calls
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per extraction response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Employee directory backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Resource matcher settings
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Availability resolution settings
    #[serde(default)]
    pub availability: AvailabilityConfig,

    /// Query resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    1000
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("matcher", &self.matcher)
            .field("availability", &self.availability)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "file" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Path of the JSON directory file (file backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_store_backend() -> String {
    "file".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// FIFO capacity ceiling
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    3600
}
fn default_cache_capacity() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Cap on values pushed in a single any-of predicate. The store's own
    /// ceiling wins when it is lower.
    #[serde(default = "default_any_of_limit")]
    pub any_of_limit: usize,

    /// Report where the top rank exists when a location search for it
    /// comes back empty.
    #[serde(default = "default_true")]
    pub fallback_broadening: bool,
}

fn default_any_of_limit() -> usize {
    10
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            any_of_limit: default_any_of_limit(),
            fallback_broadening: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    /// "unknown" (default) or "unavailable"
    #[serde(default)]
    pub missing_weeks: MissingWeekPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Include co-equals of the boundary ranks in "between X and Y".
    #[serde(default)]
    pub between_includes_coequals: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.resgenie/config.toml).
    ///
    /// Also checks environment variables:
    /// - `RESGENIE_API_KEY` (highest priority), `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`
    /// - `RESGENIE_PROVIDER`, `RESGENIE_MODEL`
    /// - `RESGENIE_DATA` (path of the employee directory file)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("RESGENIE_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("RESGENIE_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("RESGENIE_MODEL") {
            config.default_model = model;
        }

        if let Ok(data) = std::env::var("RESGENIE_DATA") {
            config.store.path = Some(PathBuf::from(data));
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".resgenie")
    }

    /// Where the employee directory file lives unless configured otherwise.
    pub fn data_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("directory.json"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be > 0".into(),
            ));
        }

        if self.matcher.any_of_limit == 0 {
            return Err(ConfigError::ValidationError(
                "matcher.any_of_limit must be > 0".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown store.backend '{}' (expected \"file\" or \"memory\")",
                self.store.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            matcher: MatcherConfig::default(),
            availability: AvailabilityConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
