//! Flow emptiness.
//!
//! A flow is empty when it has nothing a user would recognise as
//! configuration: no components in the root group, and no named reporting
//! task or controller service. Every predicate here is pure.

use crate::dataflow::DataFlow;
use crate::extract::{FlowModel, extract};
use crate::records::{ControllerServiceRecord, ProcessGroupRecord, ReportingTaskRecord};
use flowgate_core::FlowError;
use flowgate_document::parse_flow_bytes;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Whether a root group carries no components.
///
/// Input ports and group-level controller services do not count.
#[must_use]
pub fn is_process_group_empty(group: Option<&ProcessGroupRecord>) -> bool {
    let Some(contents) = group.and_then(|g| g.contents.as_ref()) else {
        return true;
    };

    contents.processors.is_empty()
        && contents.connections.is_empty()
        && contents.funnels.is_empty()
        && contents.labels.is_empty()
        && contents.output_ports.is_empty()
        && contents.process_groups.is_empty()
        && contents.remote_process_groups.is_empty()
}

/// Whether the reporting task is absent or unnamed
#[must_use]
pub fn is_reporting_task_empty(task: Option<&ReportingTaskRecord>) -> bool {
    task.is_none_or(|t| is_blank(&t.name))
}

/// Whether the controller service is absent or unnamed
#[must_use]
pub fn is_controller_service_empty(service: Option<&ControllerServiceRecord>) -> bool {
    service.is_none_or(|s| is_blank(&s.name))
}

/// Whether an extracted model is empty
#[must_use]
pub fn is_model_empty(model: &FlowModel) -> bool {
    is_process_group_empty(model.root_group.as_ref())
        && is_reporting_task_empty(model.reporting_task.as_ref())
        && is_controller_service_empty(model.controller_service.as_ref())
}

/// Whether raw flow bytes describe an empty flow.
///
/// Empty bytes are empty without being parsed.
///
/// # Errors
///
/// Returns error if non-empty bytes fail to parse or validate
pub fn is_flow_empty(bytes: &[u8]) -> Result<bool, FlowError> {
    if bytes.is_empty() {
        return Ok(true);
    }
    match parse_flow_bytes(bytes)? {
        None => Ok(true),
        Some(doc) => Ok(is_model_empty(&extract(&doc))),
    }
}

/// Whether a proposed data flow is empty; no data flow at all is empty
///
/// # Errors
///
/// Returns error if the flow bytes fail to parse or validate
pub fn is_empty(data_flow: Option<&DataFlow>) -> Result<bool, FlowError> {
    match data_flow {
        None => Ok(true),
        Some(data_flow) => is_flow_empty(data_flow.flow()),
    }
}
