//! Flow load decisions.
//!
//! The synchronizer reads the stored flow, validates it, checks its bundles
//! and decides whether there is anything to load. It never applies a flow;
//! that is the caller's job.

use crate::config::SynchronizerConfig;
use crate::empty::is_model_empty;
use crate::extract::{FlowModel, extract};
use flowgate_core::FlowError;
use flowgate_document::{ElementId, FlowDocument, parse_flow_bytes};
use flowgate_extension::{BundleChecker, ExtensionResolver};
use flowgate_storage::FlowStore;
use std::sync::Arc;
use tracing::info;

/// What to do with a proposed flow
#[derive(Debug, Clone, PartialEq)]
pub enum FlowClassification {
    /// Nothing meaningful to load; start as a fresh controller
    Fresh,
    /// A valid, compatible flow to load
    Load(Box<FlowModel>),
}

impl FlowClassification {
    /// Whether the flow is fresh
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Validates and classifies flows against the installed extensions
pub struct FlowSynchronizer {
    config: SynchronizerConfig,
    store: FlowStore,
    resolver: Arc<dyn ExtensionResolver>,
}

impl FlowSynchronizer {
    /// Create a synchronizer
    #[must_use]
    pub fn new(config: SynchronizerConfig, resolver: Arc<dyn ExtensionResolver>) -> Self {
        let store = FlowStore::new(config.storage.clone());
        Self {
            config,
            store,
            resolver,
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &SynchronizerConfig {
        &self.config
    }

    /// Whether components resume their previous state after a load
    #[must_use]
    pub fn auto_resume_state(&self) -> bool {
        self.config.auto_resume_state
    }

    /// Read the stored flow; empty if none exists yet
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or decompressed
    pub fn read_flow_from_disk(&self) -> Result<Vec<u8>, FlowError> {
        Ok(self.store.read_flow()?)
    }

    /// Verify every live component resolves to an installed bundle
    ///
    /// # Errors
    ///
    /// Returns error for the first missing bundle
    pub fn check_bundle_compatibility(&self, doc: &FlowDocument) -> Result<(), FlowError> {
        BundleChecker::new(self.resolver.as_ref()).check(doc)?;
        Ok(())
    }

    /// Whether the element is a template or inside one.
    ///
    /// An id that does not belong to `doc` is never within a template.
    #[must_use]
    pub fn within_template(&self, doc: &FlowDocument, element: ElementId) -> bool {
        doc.element(element)
            .is_some_and(flowgate_extension::within_template)
    }

    /// Decide whether `bytes` should be loaded.
    ///
    /// Empty bytes and empty flows are [`FlowClassification::Fresh`].
    /// Bundles are checked before emptiness, so an empty flow referencing a
    /// missing bundle is still rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the flow is malformed, invalid or incompatible
    pub fn classify(&self, bytes: &[u8]) -> Result<FlowClassification, FlowError> {
        let Some(doc) = parse_flow_bytes(bytes)? else {
            info!("no flow configuration, starting fresh");
            return Ok(FlowClassification::Fresh);
        };

        if self.config.check_bundles {
            self.check_bundle_compatibility(&doc)?;
        }

        let model = extract(&doc);
        if is_model_empty(&model) {
            info!("flow configuration is empty, starting fresh");
            return Ok(FlowClassification::Fresh);
        }

        info!(summary = %model.summary(), "flow configuration ready to load");
        Ok(FlowClassification::Load(Box::new(model)))
    }

    /// Read the stored flow and classify it
    ///
    /// # Errors
    ///
    /// Returns error if reading fails or the flow is rejected
    pub fn load_from_disk(&self) -> Result<FlowClassification, FlowError> {
        let bytes = self.read_flow_from_disk()?;
        self.classify(&bytes)
    }
}

impl std::fmt::Debug for FlowSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSynchronizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
