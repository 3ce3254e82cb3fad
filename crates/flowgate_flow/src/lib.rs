//! FLOWGATE Flow Model
//!
//! Projects a validated flow document into typed records and decides what a
//! controller should do with it: load it, or treat it as empty and start
//! fresh.
//!
//! Decoding is keyed by the encoding version declared on the root group.
//! Emptiness is a pure predicate over the extracted records.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dataflow;
pub mod decode;
pub mod empty;
pub mod extract;
pub mod records;
pub mod synchronizer;

pub use config::{ConfigError, SynchronizerConfig};
pub use dataflow::DataFlow;
pub use decode::{FieldLayout, FlowDecoder};
pub use empty::{
    is_controller_service_empty, is_empty, is_flow_empty, is_model_empty, is_process_group_empty,
    is_reporting_task_empty,
};
pub use extract::{FlowModel, FlowSummary, extract};
pub use records::{
    ConnectionRecord, ControllerServiceRecord, FlowSnippet, FunnelRecord, LabelRecord, PortRecord,
    Position, ProcessGroupRecord, ProcessorRecord, Properties, RemotePortRecord,
    RemoteProcessGroupRecord, ReportingTaskRecord, Size,
};
pub use synchronizer::{FlowClassification, FlowSynchronizer};
