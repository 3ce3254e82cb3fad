//! Synchronizer configuration.

use flowgate_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Cannot read config {}: {source}", path.display())]
    Io {
        /// Config location
        path: PathBuf,
        /// Underlying fault
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        /// Config location
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

/// Flow synchronizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynchronizerConfig {
    /// Where the flow is stored
    pub storage: StorageConfig,
    /// Whether components resume their last state after a load
    pub auto_resume_state: bool,
    /// Whether loads verify bundle compatibility
    pub check_bundles: bool,
    /// JSON manifest listing the installed bundles
    pub extensions_manifest: Option<PathBuf>,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            auto_resume_state: true,
            check_bundles: true,
            extensions_manifest: None,
        }
    }
}

impl SynchronizerConfig {
    /// Load from a JSON file; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Use the given storage configuration
    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Enable or disable bundle checks
    #[must_use]
    pub fn with_check_bundles(mut self, check_bundles: bool) -> Self {
        self.check_bundles = check_bundles;
        self
    }

    /// Use a bundle manifest
    #[must_use]
    pub fn with_extensions_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.extensions_manifest = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SynchronizerConfig::default();
        assert!(config.auto_resume_state);
        assert!(config.check_bundles);
        assert!(config.extensions_manifest.is_none());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowgate.json");
        fs::write(
            &path,
            r#"{
                "storage": {"flow_configuration_file": "/data/flow.xml.gz"},
                "check_bundles": false,
                "extensions_manifest": "/data/extensions.json"
            }"#,
        )
        .unwrap();

        let config = SynchronizerConfig::from_json_file(&path).unwrap();
        assert_eq!(
            config.storage.flow_configuration_file,
            PathBuf::from("/data/flow.xml.gz")
        );
        assert_eq!(config.storage.compression_level, 6);
        assert!(!config.check_bundles);
        assert!(config.auto_resume_state);
        assert_eq!(
            config.extensions_manifest,
            Some(PathBuf::from("/data/extensions.json"))
        );
    }

    #[test]
    fn test_from_json_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = SynchronizerConfig::from_json_file(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = SynchronizerConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
