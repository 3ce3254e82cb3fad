//! Compressed flow store.

use crate::config::StorageConfig;
use crate::error::StorageError;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Read and decompress the flow stored at `path`.
///
/// A missing or zero-length file yields an empty buffer. Concatenated gzip
/// members are decompressed in sequence. Faults are returned unchanged;
/// nothing is retried.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid gzip
pub fn read_flow(path: &Path) -> Result<Vec<u8>, StorageError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no flow configuration on disk");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if metadata.len() == 0 {
        debug!(path = %path.display(), "flow configuration is zero-length");
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|source| StorageError::Decompress {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        compressed = metadata.len(),
        decompressed = bytes.len(),
        "read flow configuration"
    );
    Ok(bytes)
}

/// Compress `xml` and store it at `path`.
///
/// The data is written to a temporary file in the same directory and renamed
/// into place, so readers never observe a half-written flow. The temporary
/// file is removed if any step fails.
///
/// # Errors
///
/// Returns error if any filesystem operation fails
pub fn write_flow(path: &Path, xml: &[u8], level: u32) -> Result<(), StorageError> {
    let io_err = |source: io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(io_err)?;
            parent
        }
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let mut encoder = GzEncoder::new(BufWriter::new(tmp), Compression::new(level.min(9)));
    encoder.write_all(xml).map_err(io_err)?;
    let writer = encoder.finish().map_err(io_err)?;
    let tmp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = xml.len(), "wrote flow configuration");
    Ok(())
}

/// Flow store bound to a configured location
#[derive(Debug, Clone, Default)]
pub struct FlowStore {
    /// Store configuration
    config: StorageConfig,
}

impl FlowStore {
    /// Create a store for the given configuration
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Location of the flow configuration
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.flow_configuration_file
    }

    /// Read the stored flow, empty if none exists yet
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn read_flow(&self) -> Result<Vec<u8>, StorageError> {
        read_flow(self.path())
    }

    /// Replace the stored flow
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write_flow(&self, xml: &[u8]) -> Result<(), StorageError> {
        write_flow(self.path(), xml, self.config.compression_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW: &[u8] = b"<flowController><rootGroup/></flowController>";

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = read_flow(&dir.path().join("flow.xml.gz")).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_read_zero_length_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.xml.gz");
        File::create(&path).unwrap();
        assert!(read_flow(&path).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlowStore::new(
            StorageConfig::default().with_flow_file(dir.path().join("conf/flow.xml.gz")),
        );

        store.write_flow(FLOW).unwrap();
        assert_eq!(store.read_flow().unwrap(), FLOW);
        let entries = fs::read_dir(dir.path().join("conf")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // renaming a file over a directory fails
        let target = dir.path().join("flow.xml.gz");
        fs::create_dir(&target).unwrap();

        let err = write_flow(&target, FLOW, 6).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(target.is_dir());
    }

    #[test]
    fn test_read_multimember_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.xml.gz");
        let (head, tail) = FLOW.split_at(16);

        let mut raw = Vec::new();
        for part in [head, tail] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(part).unwrap();
            raw.extend(encoder.finish().unwrap());
        }
        fs::write(&path, raw).unwrap();

        assert_eq!(read_flow(&path).unwrap(), FLOW);
    }

    #[test]
    fn test_write_is_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.xml.gz");
        write_flow(&path, FLOW, 9).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_read_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.xml.gz");
        fs::write(&path, b"definitely not gzip").unwrap();

        let err = read_flow(&path).unwrap_err();
        assert!(matches!(err, StorageError::Decompress { .. }));
        assert_eq!(err.path(), &path);
    }

    #[test]
    fn test_storage_error_into_flow_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.xml.gz");
        fs::write(&path, b"junk").unwrap();

        let err: flowgate_core::FlowError = read_flow(&path).unwrap_err().into();
        assert!(matches!(err, flowgate_core::FlowError::Io { .. }));
    }
}
