//! Engine configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::schema::Aggregation;
use crate::workflow::DEFAULT_BIN_COUNT;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Buckets used when binning quantitative candidates
    pub bin_count: usize,
    /// Wait before running a session's explain request
    pub debounce_ms: u64,
    /// Aggregation for measures that declare none
    pub default_aggregation: Aggregation,
    /// Minimum log severity (`trace`, `info`, `warn`, `error`, `fatal`)
    pub log_level: String,
    /// Memoize computation results per context
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            debounce_ms: 100,
            default_aggregation: Aggregation::Sum,
            log_level: "info".to_string(),
            cache_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content)?;

        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);

        Ok(config)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bin_count == 0 {
            return Err(ConfigError::Invalid("bin_count must be > 0".into()));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Parsed log severity, INFO when unrecognized
    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    /// Installs the configured minimum severity on the global logger
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.log_severity());
    }

    /// Debounce interval
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.bin_count, 10);
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.default_aggregation, Aggregation::Sum);
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json(r#"{"bin_count": 4, "default_aggregation": "mean"}"#).unwrap();
        assert_eq!(config.bin_count, 4);
        assert_eq!(config.default_aggregation, Aggregation::Mean);
        assert_eq!(config.debounce_ms, 100);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let err = EngineConfig::from_json(r#"{"bin_count": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = EngineConfig::from_json(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"debounce_ms": 5, "cache_enabled": false}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.debounce_ms, 5);
        assert!(!config.cache_enabled);

        let missing = EngineConfig::load(Path::new("/nonexistent/chartflow.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
