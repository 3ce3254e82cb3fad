//! Installed extension registry.

use flowgate_core::BundleCoordinate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

/// Why a component could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No bundle with these coordinates is installed
    BundleNotInstalled { coordinate: BundleCoordinate },
    /// The bundle is installed but does not provide the component type
    TypeNotInBundle {
        component_type: String,
        coordinate: BundleCoordinate,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BundleNotInstalled { coordinate } => {
                write!(f, "Bundle not installed: {}", coordinate)
            }
            Self::TypeNotInBundle {
                component_type,
                coordinate,
            } => write!(f, "Bundle {} does not provide {}", coordinate, component_type),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Error from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A bundle with the same coordinates is already installed
    #[error("Bundle already registered: {coordinate}")]
    AlreadyRegistered {
        /// Duplicate coordinates
        coordinate: BundleCoordinate,
    },
    /// The manifest file could not be read
    #[error("Cannot read extension manifest {}: {source}", path.display())]
    Io {
        /// Manifest location
        path: PathBuf,
        /// Underlying fault
        #[source]
        source: std::io::Error,
    },
    /// The manifest file is not a valid manifest
    #[error("Invalid extension manifest {}: {source}", path.display())]
    Manifest {
        /// Manifest location
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

/// Lookup of installed extensions by component type and bundle coordinates
pub trait ExtensionResolver: Send + Sync {
    /// Resolve the bundle that provides `component_type`
    ///
    /// # Errors
    ///
    /// Returns error if the bundle is not installed or lacks the type
    fn resolve(
        &self,
        component_type: &str,
        coordinate: &BundleCoordinate,
    ) -> Result<Arc<Bundle>, ResolveError>;
}

/// An installed extension bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Bundle coordinates
    #[serde(flatten)]
    pub coordinate: BundleCoordinate,
    /// Component types the bundle provides
    #[serde(default)]
    pub types: BTreeSet<String>,
}

impl Bundle {
    /// Create a bundle providing no types yet
    #[must_use]
    pub fn new(coordinate: BundleCoordinate) -> Self {
        Self {
            coordinate,
            types: BTreeSet::new(),
        }
    }

    /// Add a provided component type
    #[must_use]
    pub fn with_type(mut self, component_type: impl Into<String>) -> Self {
        self.types.insert(component_type.into());
        self
    }

    /// Whether the bundle provides `component_type`
    #[must_use]
    pub fn provides(&self, component_type: &str) -> bool {
        self.types.contains(component_type)
    }
}

/// On-disk list of installed bundles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Installed bundles
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

/// Registry of installed bundles
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    /// Installed bundles by coordinates
    bundles: IndexMap<BundleCoordinate, Arc<Bundle>>,
}

impl ExtensionRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a manifest
    ///
    /// # Errors
    ///
    /// Returns error if the manifest lists the same coordinates twice
    pub fn from_manifest(manifest: ExtensionManifest) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for bundle in manifest.bundles {
            registry.register(bundle)?;
        }
        Ok(registry)
    }

    /// Load a registry from a JSON manifest file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_manifest_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: ExtensionManifest =
            serde_json::from_slice(&raw).map_err(|source| RegistryError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;

        let registry = Self::from_manifest(manifest)?;
        debug!(
            path = %path.display(),
            bundles = registry.count(),
            "loaded extension manifest"
        );
        Ok(registry)
    }

    /// Install a bundle
    ///
    /// # Errors
    ///
    /// Returns error if a bundle with the same coordinates is installed
    pub fn register(&mut self, bundle: Bundle) -> Result<(), RegistryError> {
        if self.bundles.contains_key(&bundle.coordinate) {
            return Err(RegistryError::AlreadyRegistered {
                coordinate: bundle.coordinate,
            });
        }
        self.bundles
            .insert(bundle.coordinate.clone(), Arc::new(bundle));
        Ok(())
    }

    /// Remove a bundle, returning it if it was installed
    pub fn unregister(&mut self, coordinate: &BundleCoordinate) -> Option<Arc<Bundle>> {
        self.bundles.shift_remove(coordinate)
    }

    /// Get a bundle by coordinates
    #[must_use]
    pub fn get(&self, coordinate: &BundleCoordinate) -> Option<Arc<Bundle>> {
        self.bundles.get(coordinate).cloned()
    }

    /// Check if a bundle is installed
    #[must_use]
    pub fn contains(&self, coordinate: &BundleCoordinate) -> bool {
        self.bundles.contains_key(coordinate)
    }

    /// Coordinates of every installed bundle, in registration order
    #[must_use]
    pub fn list(&self) -> Vec<BundleCoordinate> {
        self.bundles.keys().cloned().collect()
    }

    /// Number of installed bundles
    #[must_use]
    pub fn count(&self) -> usize {
        self.bundles.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

impl ExtensionResolver for ExtensionRegistry {
    fn resolve(
        &self,
        component_type: &str,
        coordinate: &BundleCoordinate,
    ) -> Result<Arc<Bundle>, ResolveError> {
        let bundle = self
            .bundles
            .get(coordinate)
            .ok_or_else(|| ResolveError::BundleNotInstalled {
                coordinate: coordinate.clone(),
            })?;

        if !bundle.provides(component_type) {
            return Err(ResolveError::TypeNotInBundle {
                component_type: component_type.to_string(),
                coordinate: coordinate.clone(),
            });
        }
        Ok(Arc::clone(bundle))
    }
}

/// Thread-safe registry for concurrent access.
///
/// Lookups take the read lock for a single resolution only.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: RwLock<ExtensionRegistry>,
}

impl SharedRegistry {
    /// Create a new shared registry
    #[must_use]
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self {
            inner: RwLock::new(registry),
        }
    }

    /// Install a bundle
    ///
    /// # Errors
    ///
    /// Returns error if a bundle with the same coordinates is installed
    pub fn register(&self, bundle: Bundle) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        registry.register(bundle)
    }

    /// Coordinates of every installed bundle
    #[must_use]
    pub fn list(&self) -> Vec<BundleCoordinate> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.list()
    }

    /// Number of installed bundles
    #[must_use]
    pub fn count(&self) -> usize {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.count()
    }
}

impl ExtensionResolver for SharedRegistry {
    fn resolve(
        &self,
        component_type: &str,
        coordinate: &BundleCoordinate,
    ) -> Result<Arc<Bundle>, ResolveError> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.resolve(component_type, coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn standard() -> BundleCoordinate {
        BundleCoordinate::new("org.apache.nifi", "nifi-standard-nar", "1.9.0")
    }

    fn standard_bundle() -> Bundle {
        Bundle::new(standard())
            .with_type("org.apache.nifi.processors.standard.GenerateFlowFile")
            .with_type("org.apache.nifi.processors.standard.LogAttribute")
    }

    #[test]
    fn test_registry_new() {
        let registry = ExtensionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ExtensionRegistry::new();
        registry.register(standard_bundle()).unwrap();
        assert_eq!(registry.count(), 1);
        assert!(registry.contains(&standard()));
        assert_eq!(registry.list(), vec![standard()]);
    }

    #[test]
    fn test_registry_register_duplicate() {
        let mut registry = ExtensionRegistry::new();
        registry.register(standard_bundle()).unwrap();
        let err = registry.register(Bundle::new(standard())).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_registry_unregister() {
        let mut registry = ExtensionRegistry::new();
        registry.register(standard_bundle()).unwrap();
        assert!(registry.unregister(&standard()).is_some());
        assert!(!registry.contains(&standard()));
        assert!(registry.get(&standard()).is_none());
    }

    #[test]
    fn test_resolve() {
        let mut registry = ExtensionRegistry::new();
        registry.register(standard_bundle()).unwrap();

        let bundle = registry
            .resolve("org.apache.nifi.processors.standard.LogAttribute", &standard())
            .unwrap();
        assert_eq!(bundle.coordinate, standard());

        let err = registry
            .resolve("org.example.Unknown", &standard())
            .unwrap_err();
        assert!(matches!(err, ResolveError::TypeNotInBundle { .. }));

        let missing = BundleCoordinate::new("org.example", "example-nar", "0.1");
        let err = registry.resolve("org.example.Thing", &missing).unwrap_err();
        assert_eq!(err, ResolveError::BundleNotInstalled { coordinate: missing });
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::BundleNotInstalled {
            coordinate: standard(),
        };
        assert_eq!(
            err.to_string(),
            "Bundle not installed: org.apache.nifi:nifi-standard-nar:1.9.0"
        );
    }

    #[test]
    fn test_from_manifest_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bundles": [
                {{"group": "org.apache.nifi", "artifact": "nifi-standard-nar", "version": "1.9.0",
                  "types": ["org.apache.nifi.processors.standard.LogAttribute"]}},
                {{"group": "org.apache.nifi", "artifact": "nifi-dbcp-service-nar", "version": "1.9.0"}}
            ]}}"#
        )
        .unwrap();

        let registry = ExtensionRegistry::from_manifest_file(file.path()).unwrap();
        assert_eq!(registry.count(), 2);
        assert!(
            registry
                .resolve("org.apache.nifi.processors.standard.LogAttribute", &standard())
                .is_ok()
        );
    }

    #[test]
    fn test_from_manifest_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExtensionRegistry::from_manifest_file(&dir.path().join("missing.json"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));

        let path = dir.path().join("bad.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = ExtensionRegistry::from_manifest_file(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Manifest { .. }));
    }

    #[test]
    fn test_shared_registry() {
        let shared = SharedRegistry::default();
        shared.register(standard_bundle()).unwrap();
        assert_eq!(shared.count(), 1);
        assert_eq!(shared.list(), vec![standard()]);
        assert!(
            shared
                .resolve("org.apache.nifi.processors.standard.GenerateFlowFile", &standard())
                .is_ok()
        );
    }
}
