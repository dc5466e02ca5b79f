//! Configuration loading.
//!
//! Loads `./labelgate.toml` (or `$LABELGATE_CONFIG_PATH`). Environment
//! variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub mod rules;

pub use rules::{CollectionSpec, ConfigError, FieldRule, LabelRule, PolicySpec};

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
    /// Declared collections (`[[collections]]`).
    pub collections: Vec<CollectionSpec>,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::config_path_with(&env);
        let mut config = Self::load_from_path(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides. A missing file yields
    /// defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string into config.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Resolve the config path: `$LABELGATE_CONFIG_PATH`, else `./labelgate.toml`.
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("LABELGATE_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("labelgate.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("LABELGATE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("LABELGATE_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("LABELGATE_LOG_JSON") {
            match v.parse() {
                Ok(b) => self.logging.json = b,
                Err(_) => tracing::warn!(
                    var = "LABELGATE_LOG_JSON",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Look up a declared collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated log files; console only when unset.
    pub dir: Option<PathBuf>,
    /// Emit console output as JSON.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
            json: false,
        }
    }
}
