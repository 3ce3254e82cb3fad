//! Error taxonomy for flow loading.
//!
//! Every failure a flow-load attempt can hit falls into one of three classes.
//! None of them is caught or downgraded inside flowgate; the caller decides
//! whether to abort startup, fall back to an empty flow, or alert an operator.

use crate::bundle::BundleCoordinate;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used to carry the underlying cause across crate boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Flow result type
pub type FlowResult<T> = Result<T, FlowError>;

/// Flow error type
#[derive(Debug, Error)]
pub enum FlowError {
    /// Malformed bytes, XML well-formedness violation, or schema non-conformance
    #[error("flow serialization failed: {0}")]
    Serialization(#[source] BoxError),

    /// A live component declares a bundle that is not installed
    #[error("missing bundle for {component_type} from {coordinate}: {reason}")]
    MissingBundle {
        /// Declared component type
        component_type: String,
        /// Declared bundle coordinates
        coordinate: BundleCoordinate,
        /// Why resolution failed
        reason: String,
    },

    /// Storage read or write failure
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Location being accessed
        path: PathBuf,
        /// Underlying fault
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    /// Wrap any parse or validation failure as a serialization error
    pub fn serialization(err: impl Into<BoxError>) -> Self {
        Self::Serialization(err.into())
    }

    /// Whether this error rejects the given input (as opposed to an I/O fault
    /// the caller may retry)
    #[must_use]
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::MissingBundle { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::MissingBundle {
            component_type: "org.example.GenerateRecord".to_string(),
            coordinate: BundleCoordinate::new("org.example", "example-nar", "1.0.0"),
            reason: "bundle is not installed".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("org.example.GenerateRecord"));
        assert!(s.contains("org.example:example-nar:1.0.0"));
    }

    #[test]
    fn test_serialization_keeps_source() {
        let err = FlowError::serialization("unexpected root element");
        assert_eq!(
            format!("{}", err),
            "flow serialization failed: unexpected root element"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_display() {
        let err = FlowError::Io {
            path: PathBuf::from("/var/flow/flow.xml.gz"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let s = format!("{}", err);
        assert!(s.contains("/var/flow/flow.xml.gz"));
        assert!(!err.is_input_rejection());
    }

    #[test]
    fn test_input_rejection() {
        assert!(FlowError::serialization("bad").is_input_rejection());
    }
}
