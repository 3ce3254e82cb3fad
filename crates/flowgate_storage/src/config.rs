//! Storage configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Location of the compressed flow configuration
    pub flow_configuration_file: PathBuf,
    /// Gzip level used when writing (0-9)
    pub compression_level: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            flow_configuration_file: PathBuf::from("conf/flow.xml.gz"),
            compression_level: 6,
        }
    }
}

impl StorageConfig {
    /// Create a config pointing at the given flow file
    #[must_use]
    pub fn with_flow_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.flow_configuration_file = path.into();
        self
    }

    /// Set the compression level, clamped to 9
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.flow_configuration_file, PathBuf::from("conf/flow.xml.gz"));
        assert_eq!(config.compression_level, 6);
    }

    #[test]
    fn test_config_partial_json() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"flow_configuration_file": "/tmp/flow.xml.gz"}"#).unwrap();
        assert_eq!(config.flow_configuration_file, PathBuf::from("/tmp/flow.xml.gz"));
        assert_eq!(config.compression_level, 6);
    }

    #[test]
    fn test_compression_level_clamped() {
        let config = StorageConfig::default().with_compression_level(42);
        assert_eq!(config.compression_level, 9);
    }
}
