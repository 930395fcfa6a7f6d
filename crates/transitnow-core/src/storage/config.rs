//! TOML-based application configuration.
//!
//! Stores:
//! - Catalog source and freshness threshold
//! - Constellation boundary table source
//! - Build lookahead, epoch bound and optional RNG seed
//! - Emission transport, pacing and retry settings
//!
//! Configuration is stored at `~/.config/transitnow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::predictor::DEFAULT_MAX_EPOCHS;

/// Catalog acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// Local catalog file; defaults to `exoplanets.csv` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Re-download when the local copy is older than this.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    #[serde(default = "default_boundaries_url")]
    pub boundaries_url: String,
    /// Constellation boundary table; defaults to `constellations.dat` in the data directory.
    #[serde(default)]
    pub boundaries_path: Option<PathBuf>,
}

/// Schedule build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: f64,
    #[serde(default = "default_max_epochs")]
    pub max_epochs: u32,
    /// Random seed for reproducible builds (None = entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Console,
    Outbox,
    Webhook,
}

/// Emission settings for the per-minute consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Seconds over which a minute's messages are spread.
    #[serde(default = "default_spread_secs")]
    pub spread_secs: u64,
    /// No retry is started past this many seconds into the minute.
    #[serde(default = "default_budget_secs")]
    pub budget_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on each further attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/transitnow/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub emit: EmitConfig,
}

// Default functions
fn default_catalog_url() -> String {
    "http://www.exoplanets.org/csv-files/exoplanets.csv".into()
}
fn default_boundaries_url() -> String {
    "https://cdsarc.cds.unistra.fr/ftp/VI/42/data.dat".into()
}
fn default_max_age_days() -> u32 {
    7
}
fn default_lookahead_days() -> f64 {
    1.2
}
fn default_max_epochs() -> u32 {
    DEFAULT_MAX_EPOCHS
}
fn default_transport() -> TransportKind {
    TransportKind::Console
}
fn default_spread_secs() -> u64 {
    50
}
fn default_budget_secs() -> u64 {
    58
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    1000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            path: None,
            max_age_days: default_max_age_days(),
            boundaries_url: default_boundaries_url(),
            boundaries_path: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
            max_epochs: default_max_epochs(),
            seed: None,
        }
    }
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            webhook_url: None,
            spread_secs: default_spread_secs(),
            budget_secs: default_budget_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl CatalogConfig {
    pub fn catalog_path(&self, data_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir.join("exoplanets.csv"))
    }

    pub fn boundaries_path(&self, data_dir: &Path) -> PathBuf {
        self.boundaries_path
            .clone()
            .unwrap_or_else(|| data_dir.join("constellations.dat"))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional: accept JSON literals, otherwise a plain string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        super::write_atomic(path, content.as_bytes()).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Returns error if the key is unknown or the
    /// value does not fit the field. The caller persists the result.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.build.max_epochs, 2500);
        assert_eq!(parsed.emit.transport, TransportKind::Console);
        assert_eq!(parsed.build.seed, None);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.catalog.max_age_days, 7);
        assert_eq!(cfg.build.lookahead_days, 1.2);
        assert_eq!(cfg.emit.spread_secs, 50);
        assert_eq!(cfg.emit.budget_secs, 58);
        assert_eq!(cfg.emit.max_attempts, 3);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[build]\nseed = 9\n").unwrap();
        assert_eq!(cfg.build.seed, Some(9));
        assert_eq!(cfg.build.lookahead_days, 1.2);
        assert_eq!(cfg.emit.backoff_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("build.max_epochs").as_deref(), Some("2500"));
        assert_eq!(cfg.get("emit.transport").as_deref(), Some("console"));
        assert_eq!(cfg.get("build.seed").as_deref(), Some("null"));
        assert!(cfg.get("build.missing_key").is_none());
    }

    #[test]
    fn set_updates_numbers_enums_and_optionals() {
        let mut cfg = Config::default();
        cfg.set("build.lookahead_days", "2.5").unwrap();
        cfg.set("emit.transport", "outbox").unwrap();
        cfg.set("build.seed", "42").unwrap();
        cfg.set("emit.webhook_url", "https://example.com/hook").unwrap();
        assert_eq!(cfg.build.lookahead_days, 2.5);
        assert_eq!(cfg.emit.transport, TransportKind::Outbox);
        assert_eq!(cfg.build.seed, Some(42));
        assert_eq!(cfg.emit.webhook_url.as_deref(), Some("https://example.com/hook"));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("build.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("build.max_epochs", "lots").is_err());
        assert!(cfg.set("emit.transport", "carrier-pigeon").is_err());
        assert_eq!(cfg.emit.transport, TransportKind::Console);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.build.max_epochs, 2500);

        let mut changed = cfg.clone();
        changed.set("catalog.max_age_days", "14").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().catalog.max_age_days, 14);
    }

    #[test]
    fn default_paths_live_in_data_dir() {
        let cfg = CatalogConfig::default();
        let dir = Path::new("/data");
        assert_eq!(cfg.catalog_path(dir), dir.join("exoplanets.csv"));
        assert_eq!(cfg.boundaries_path(dir), dir.join("constellations.dat"));
    }
}
