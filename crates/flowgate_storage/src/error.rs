//! Storage errors.

use flowgate_core::FlowError;
use std::path::PathBuf;
use thiserror::Error;

/// Store error
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing or renaming the file failed
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying fault
        #[source]
        source: std::io::Error,
    },
    /// The file exists but its gzip stream is corrupt or truncated
    #[error("Decompression error on {}: {source}", path.display())]
    Decompress {
        /// File being read
        path: PathBuf,
        /// Underlying fault
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Path the failed operation was accessing
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } | Self::Decompress { path, .. } => path,
        }
    }
}

impl From<StorageError> for FlowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io { path, source } | StorageError::Decompress { path, source } => {
                FlowError::Io { path, source }
            }
        }
    }
}
