//! Proposed data flow.

use serde::{Deserialize, Serialize};

/// A flow proposed for loading, as uncompressed configuration bytes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataFlow {
    flow: Vec<u8>,
}

impl DataFlow {
    /// Wrap flow bytes
    #[must_use]
    pub fn new(flow: Vec<u8>) -> Self {
        Self { flow }
    }

    /// The flow configuration bytes
    #[must_use]
    pub fn flow(&self) -> &[u8] {
        &self.flow
    }

    /// Take the bytes back
    #[must_use]
    pub fn into_flow(self) -> Vec<u8> {
        self.flow
    }
}

impl From<Vec<u8>> for DataFlow {
    fn from(flow: Vec<u8>) -> Self {
        Self::new(flow)
    }
}
