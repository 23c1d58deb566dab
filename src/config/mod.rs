//! Configuration for pipeline runs
//!
//! A [`PipelineConfig`] controls how a pipeline is executed and how the
//! process logs. It is stored as TOML; every field has a default, so a
//! partial (or empty) file is valid.
//!
//! # Example
//!
//! ```toml
//! [execution]
//! chunk_size = 4096
//!
//! [logging]
//! filter = "cloudpipe=debug"
//! ansi = false
//! directory = "/var/log/cloudpipe"
//! ```

use crate::error::{CloudPipeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of points pulled per writer iteration
pub const DEFAULT_CHUNK_SIZE: u32 = 8192;

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Streaming execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Capacity of the buffer a writer allocates for each pull
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Colored terminal output
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Write logs to a daily-rotated file in this directory instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            ansi: true,
            directory: None,
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_true() -> bool {
    true
}

impl PipelineConfig {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CloudPipeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CloudPipeError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| CloudPipeError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            CloudPipeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.execution.chunk_size == 0 {
            return Err(CloudPipeError::Config(
                "execution.chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.execution.chunk_size = chunk_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.execution.chunk_size, 8192);
        assert_eq!(config.logging.filter, "info");
        assert!(config.logging.ansi);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = PipelineConfig::from_toml_str("[execution]\nchunk_size = 100\n").unwrap();
        assert_eq!(config.execution.chunk_size, 100);
        assert_eq!(config.logging, LoggingConfig::default());

        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = PipelineConfig::from_toml_str("[execution]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, CloudPipeError::Config(_)));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = PipelineConfig::from_toml_str("[execution\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudpipe.toml");

        let mut config = PipelineConfig::default().with_chunk_size(256);
        config.logging.directory = Some(dir.path().join("logs"));
        config.logging.ansi = false;
        config.save(&path).unwrap();

        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load("/nonexistent/cloudpipe.toml").unwrap_err();
        assert!(matches!(err, CloudPipeError::Config(_)));
    }
}
