//! Configuration management
//!
//! Settings come from a TOML file or from `INTEGRITY_<SECTION>_<KEY>`
//! environment variables layered over the defaults, and are validated
//! before use.

use crate::logging::{LogConfig, LogLevel};
use crate::store::RECORD_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State database configuration
    pub store: StoreConfig,

    /// Key layout configuration
    pub keyspace: KeyspaceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// State database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,
}

/// Key layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyspaceConfig {
    /// Namespace every record key is stored under
    pub namespace: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/integrity.db"),
            pool_size: 4,
        }
    }
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            namespace: RECORD_NAMESPACE.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Subscriber settings for this section
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let level: LogLevel = self.level.parse().map_err(|_| ConfigError::InvalidValue {
            key: "logging.level",
            value: self.level.clone(),
        })?;
        Ok(LogConfig::new(level)
            .json_format(self.json_format)
            .with_target(self.with_target))
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: INTEGRITY_<SECTION>_<KEY>
    /// Example: INTEGRITY_STORE_DB_PATH=/var/lib/integrity/state.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from `lookup` onto this configuration
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("INTEGRITY_STORE_DB_PATH") {
            self.store.db_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("INTEGRITY_STORE_POOL_SIZE") {
            self.store.pool_size = parse_env("INTEGRITY_STORE_POOL_SIZE", size)?;
        }
        if let Some(namespace) = lookup("INTEGRITY_KEYSPACE_NAMESPACE") {
            self.keyspace.namespace = namespace;
        }
        if let Some(level) = lookup("INTEGRITY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("INTEGRITY_LOG_JSON") {
            self.logging.json_format = parse_env("INTEGRITY_LOG_JSON", json)?;
        }
        if let Some(target) = lookup("INTEGRITY_LOG_TARGET") {
            self.logging.with_target = parse_env("INTEGRITY_LOG_TARGET", target)?;
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.keyspace.namespace.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "keyspace namespace must not be empty".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keyspace.namespace, "sender~bucket~index");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.store.pool_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.keyspace.namespace.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("INTEGRITY_STORE_DB_PATH", "/tmp/state.db"),
            ("INTEGRITY_STORE_POOL_SIZE", "8"),
            ("INTEGRITY_KEYSPACE_NAMESPACE", "anchors"),
            ("INTEGRITY_LOG_LEVEL", "warn"),
            ("INTEGRITY_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.db_path, PathBuf::from("/tmp/state.db"));
        assert_eq!(config.store.pool_size, 8);
        assert_eq!(config.keyspace.namespace, "anchors");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
        assert!(config.logging.with_target);
    }

    #[test]
    fn test_apply_env_rejects_bad_values() {
        let mut config = Config::default();
        let result = config.apply_env(|name| {
            (name == "INTEGRITY_STORE_POOL_SIZE").then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "INTEGRITY_STORE_POOL_SIZE", .. })
        ));

        let result = config.apply_env(|name| (name == "INTEGRITY_LOG_JSON").then(|| "yes".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integrity.toml");

        let mut config = Config::default();
        config.store.pool_size = 2;
        config.logging.level = "trace".to_string();
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integrity.toml");
        std::fs::write(&path, "[keyspace]\nnamespace = \"custom\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.keyspace.namespace, "custom");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/integrity.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_unparseable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integrity.toml");
        std::fs::write(&path, "[store\npool_size = ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_log_config_from_section() {
        let section = LoggingConfig {
            level: "debug".to_string(),
            json_format: true,
            with_target: false,
        };
        let log = section.log_config().unwrap();
        assert_eq!(log.level, LogLevel::Debug);
        assert!(log.json_format);
        assert!(!log.with_target);
    }
}
