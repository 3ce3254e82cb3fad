//! FLOWGATE Storage
//!
//! Reads and writes gzip-compressed flow configurations on durable storage.
//! A flow that does not exist yet reads back as an empty byte sequence.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod store;

pub use config::StorageConfig;
pub use error::StorageError;
pub use store::{FlowStore, read_flow, write_flow};
