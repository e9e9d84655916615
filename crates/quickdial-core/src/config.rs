//! Configuration loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QuickDialConfig::default()`]
//! 2. If `config.json` exists, deep-merge its values over defaults
//! 3. Apply `QUICKDIAL_*` environment variable overrides (highest priority)
//!
//! `config.json` lives in `$QUICKDIAL_HOME` when set, else `~/.quickdial`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ConfigError;

/// Runtime configuration for the quick-dial store and its logging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuickDialConfig {
    /// Directory holding the database and `config.json`.
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`.
    pub database_file: String,
    /// Default log level; `RUST_LOG` still wins at init time.
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl Default for QuickDialConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: "quickdial.db".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl QuickDialConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".quickdial")
}

/// Path of the optional config file.
pub fn config_path() -> PathBuf {
    config_path_with(|key| std::env::var(key).ok())
}

fn config_path_with<F: Fn(&str) -> Option<String>>(lookup: F) -> PathBuf {
    read_string(&lookup, "QUICKDIAL_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir)
        .join("config.json")
}

/// Load config from the default path with env var overrides.
pub fn load_config() -> Result<QuickDialConfig, ConfigError> {
    load_config_from_path(&config_path())
}

/// Load config from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_config_from_path(path: &Path) -> Result<QuickDialConfig, ConfigError> {
    let mut config = load_file_layer(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn load_file_layer(path: &Path) -> Result<QuickDialConfig, ConfigError> {
    let defaults = serde_json::to_value(QuickDialConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key; anything else is replaced by `source`.
/// Nulls in `source` keep the target value.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `QUICKDIAL_*` overrides read through `lookup`.
///
/// Booleans accept `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`;
/// anything else is ignored, as is a database file name that is empty or
/// contains a path separator.
pub fn apply_env_overrides<F>(config: &mut QuickDialConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = read_string(&lookup, "QUICKDIAL_HOME") {
        config.data_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("QUICKDIAL_DB_FILE") {
        let v = v.trim();
        if v.is_empty() || v.contains(['/', '\\']) {
            debug!(value = v, "ignoring QUICKDIAL_DB_FILE that is not a plain file name");
        } else {
            config.database_file = v.to_string();
        }
    }
    if let Some(v) = read_string(&lookup, "QUICKDIAL_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Some(v) = read_bool(&lookup, "QUICKDIAL_LOG_JSON") {
        config.log_json = v;
    }
}

fn read_string<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<bool> {
    match lookup(key)?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        other => {
            debug!(key, value = other, "ignoring unparseable boolean override");
            None
        }
    }
}
