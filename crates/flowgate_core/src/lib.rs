//! FLOWGATE Core Types
//!
//! Pure types shared by every flowgate crate: the error taxonomy that flow
//! loading surfaces to its caller, bundle coordinates, and the encoding
//! version marker embedded in flow documents. No I/O happens here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod error;
pub mod version;

// Re-exports
pub use bundle::BundleCoordinate;
pub use error::{BoxError, FlowError, FlowResult};
pub use version::{EncodingVersion, VersionError};
