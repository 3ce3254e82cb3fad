//! FLOWGATE Document
//!
//! Turns raw flow bytes into an immutable, namespace-aware element tree that
//! has been validated against the fixed flow configuration schema. A document
//! is either fully valid or never constructed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handler;
pub mod parser;
pub mod schema;
pub mod tree;

pub use handler::{CollectingErrorHandler, ErrorHandler, LoggingErrorHandler, ParseIssue, Severity};
pub use parser::{FlowParser, SerializationError, parse_flow_bytes};
pub use schema::{Content, FLOW_SCHEMA, FlowSchema, SchemaViolation, SimpleType};
pub use tree::{Ancestors, Element, ElementId, FlowDocument};
