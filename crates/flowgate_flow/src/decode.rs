//! Version-keyed decoding of flow elements into records.
//!
//! The decoder trusts schema validation: required children are present and
//! typed values parse. Anything missing decodes to its default rather than
//! failing.

use crate::records::{
    ConnectionRecord, ControllerServiceRecord, FlowSnippet, FunnelRecord, LabelRecord, PortRecord,
    Position, ProcessGroupRecord, ProcessorRecord, Properties, RemotePortRecord,
    RemoteProcessGroupRecord, ReportingTaskRecord, Size,
};
use flowgate_core::{BundleCoordinate, EncodingVersion};
use flowgate_document::Element;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field layout rule set, selected by encoding version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldLayout {
    /// Unversioned flows. Controller services only exist at controller level
    /// and groups carry no variables.
    Legacy,
    /// `1.0`: groups may hold their own controller services
    V1,
    /// `1.1` and later: groups also carry variables
    V1Variables,
}

impl FieldLayout {
    /// Pick the layout for a declared version; no version means the oldest
    #[must_use]
    pub fn for_version(version: Option<EncodingVersion>) -> Self {
        match version {
            None => Self::Legacy,
            Some(v) if v.major == 0 => Self::Legacy,
            Some(v) if v.major == 1 && v.minor == 0 => Self::V1,
            Some(_) => Self::V1Variables,
        }
    }

    /// Whether process groups decode `controllerService` children
    #[must_use]
    pub fn group_controller_services(self) -> bool {
        self >= Self::V1
    }

    /// Whether process groups decode `variable` children
    #[must_use]
    pub fn group_variables(self) -> bool {
        self >= Self::V1Variables
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::V1 => write!(f, "v1"),
            Self::V1Variables => write!(f, "v1-variables"),
        }
    }
}

/// Decodes elements using one field layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowDecoder {
    layout: FieldLayout,
}

impl FlowDecoder {
    /// Create a decoder for the given layout
    #[must_use]
    pub const fn new(layout: FieldLayout) -> Self {
        Self { layout }
    }

    /// Create a decoder for a declared encoding version
    #[must_use]
    pub fn for_version(version: Option<EncodingVersion>) -> Self {
        Self::new(FieldLayout::for_version(version))
    }

    /// Layout in use
    #[must_use]
    pub const fn layout(&self) -> FieldLayout {
        self.layout
    }

    /// Decode a process group and everything nested in it.
    ///
    /// Nested groups are decoded from a work list, so nesting depth is bounded
    /// by memory rather than by the stack.
    #[must_use]
    pub fn decode_process_group(&self, element: Element<'_>) -> ProcessGroupRecord {
        // Breadth-first: every group follows its parent and siblings keep
        // document order
        let mut groups = vec![(element, None)];
        let mut next = 0;
        while next < groups.len() {
            let (group, _) = groups[next];
            groups.extend(
                group
                    .children_named("processGroup")
                    .map(|child| (child, Some(next))),
            );
            next += 1;
        }

        let mut records: Vec<ProcessGroupRecord> = groups
            .iter()
            .map(|&(group, _)| self.decode_group_shallow(group))
            .collect();

        // Children are attached back to front, so each child list fills in
        // reverse and is flipped once its owner is popped
        let mut root = None;
        while let Some(mut record) = records.pop() {
            if let Some(contents) = record.contents.as_mut() {
                contents.process_groups.reverse();
            }
            match groups[records.len()].1 {
                Some(parent) => records[parent]
                    .contents
                    .get_or_insert_with(FlowSnippet::default)
                    .process_groups
                    .push(record),
                None => root = Some(record),
            }
        }
        root.unwrap_or_default()
    }

    /// Decode a group without descending into nested groups
    fn decode_group_shallow(&self, element: Element<'_>) -> ProcessGroupRecord {
        let mut contents = FlowSnippet::default();
        let mut variables = IndexMap::new();

        for child in element.children() {
            match child.name() {
                "processor" => contents.processors.push(self.decode_processor(child)),
                "connection" => contents.connections.push(self.decode_connection(child)),
                "funnel" => contents.funnels.push(self.decode_funnel(child)),
                "label" => contents.labels.push(self.decode_label(child)),
                "inputPort" => contents.input_ports.push(self.decode_port(child)),
                "outputPort" => contents.output_ports.push(self.decode_port(child)),
                "remoteProcessGroup" => contents
                    .remote_process_groups
                    .push(self.decode_remote_process_group(child)),
                "controllerService" if self.layout.group_controller_services() => contents
                    .controller_services
                    .push(self.decode_controller_service(child)),
                "variable" if self.layout.group_variables() => {
                    if let Some(name) = child.attribute("name") {
                        variables.insert(
                            name.to_string(),
                            child.attribute("value").map(str::to_string),
                        );
                    }
                }
                _ => {}
            }
        }

        ProcessGroupRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            comments: optional_text(element, "comment"),
            position: position(element),
            variables,
            contents: Some(contents),
        }
    }

    /// Decode a processor
    #[must_use]
    pub fn decode_processor(&self, element: Element<'_>) -> ProcessorRecord {
        ProcessorRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            component_type: text(element, "class"),
            bundle: bundle(element),
            position: position(element),
            comments: optional_text(element, "comment"),
            properties: properties(element),
            max_concurrent_tasks: number(element, "maxConcurrentTasks"),
            scheduling_period: optional_text(element, "schedulingPeriod"),
            scheduling_strategy: optional_text(element, "schedulingStrategy"),
            scheduled_state: optional_text(element, "scheduledState"),
            auto_terminated_relationships: all_text(element, "autoTerminatedRelationship"),
        }
    }

    /// Decode a connection
    #[must_use]
    pub fn decode_connection(&self, element: Element<'_>) -> ConnectionRecord {
        let bend_points = element
            .child("bendPoints")
            .map(|points| points.children_named("bendPoint").map(point).collect())
            .unwrap_or_default();

        ConnectionRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            source_id: text(element, "sourceId"),
            source_group_id: text(element, "sourceGroupId"),
            source_type: text(element, "sourceType"),
            destination_id: text(element, "destinationId"),
            destination_group_id: text(element, "destinationGroupId"),
            destination_type: text(element, "destinationType"),
            relationships: all_text(element, "relationship"),
            bend_points,
            max_work_queue_size: number(element, "maxWorkQueueSize"),
            max_work_queue_data_size: optional_text(element, "maxWorkQueueDataSize"),
            flow_file_expiration: optional_text(element, "flowFileExpiration"),
            prioritizers: all_text(element, "queuePrioritizerClass"),
        }
    }

    /// Decode a funnel
    #[must_use]
    pub fn decode_funnel(&self, element: Element<'_>) -> FunnelRecord {
        FunnelRecord {
            id: text(element, "id"),
            position: position(element),
        }
    }

    /// Decode a label
    #[must_use]
    pub fn decode_label(&self, element: Element<'_>) -> LabelRecord {
        let size = element.child("size").map(|size| Size {
            width: decimal(size.attribute("width")),
            height: decimal(size.attribute("height")),
        });

        LabelRecord {
            id: text(element, "id"),
            value: optional_text(element, "value"),
            position: position(element),
            size,
        }
    }

    /// Decode an input or output port
    #[must_use]
    pub fn decode_port(&self, element: Element<'_>) -> PortRecord {
        PortRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            position: position(element),
            comments: optional_text(element, "comments"),
            scheduled_state: optional_text(element, "scheduledState"),
            max_concurrent_tasks: number(element, "maxConcurrentTasks"),
        }
    }

    /// Decode a remote process group and its ports
    #[must_use]
    pub fn decode_remote_process_group(&self, element: Element<'_>) -> RemoteProcessGroupRecord {
        // `urls` superseded the single `url`
        let target_uris = optional_text(element, "urls").or_else(|| optional_text(element, "url"));

        RemoteProcessGroupRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            target_uris,
            position: position(element),
            comments: optional_text(element, "comment"),
            communications_timeout: optional_text(element, "timeout"),
            yield_duration: optional_text(element, "yieldPeriod"),
            transport_protocol: optional_text(element, "transportProtocol"),
            transmitting: flag(element, "transmitting"),
            input_ports: element
                .children_named("inputPort")
                .map(|p| self.decode_remote_port(p))
                .collect(),
            output_ports: element
                .children_named("outputPort")
                .map(|p| self.decode_remote_port(p))
                .collect(),
        }
    }

    fn decode_remote_port(&self, element: Element<'_>) -> RemotePortRecord {
        RemotePortRecord {
            id: text(element, "id"),
            target_id: optional_text(element, "targetId"),
            name: text(element, "name"),
            comments: optional_text(element, "comments"),
            max_concurrent_tasks: number(element, "maxConcurrentTasks"),
            use_compression: flag(element, "useCompression"),
            transmitting: flag(element, "transmitting"),
        }
    }

    /// Decode a reporting task
    #[must_use]
    pub fn decode_reporting_task(&self, element: Element<'_>) -> ReportingTaskRecord {
        ReportingTaskRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            component_type: text(element, "class"),
            bundle: bundle(element),
            comments: optional_text(element, "comment"),
            properties: properties(element),
            scheduling_period: optional_text(element, "schedulingPeriod"),
            scheduling_strategy: optional_text(element, "schedulingStrategy"),
            scheduled_state: optional_text(element, "scheduledState"),
        }
    }

    /// Decode a controller service
    #[must_use]
    pub fn decode_controller_service(&self, element: Element<'_>) -> ControllerServiceRecord {
        ControllerServiceRecord {
            id: text(element, "id"),
            name: text(element, "name"),
            component_type: text(element, "class"),
            bundle: bundle(element),
            comments: optional_text(element, "comment"),
            properties: properties(element),
            enabled: flag(element, "enabled"),
        }
    }
}

fn text(element: Element<'_>, name: &str) -> String {
    element.child_text(name).unwrap_or_default().to_string()
}

fn optional_text(element: Element<'_>, name: &str) -> Option<String> {
    element.child_text(name).map(str::to_string)
}

fn all_text(element: Element<'_>, name: &str) -> Vec<String> {
    element
        .children()
        .filter(|c| c.name() == name)
        .map(|c| c.text().to_string())
        .collect()
}

fn number(element: Element<'_>, name: &str) -> Option<i64> {
    element.child_text(name).and_then(|v| v.trim().parse().ok())
}

fn flag(element: Element<'_>, name: &str) -> bool {
    matches!(element.child_text(name).map(str::trim), Some("true" | "1"))
}

fn decimal(value: Option<&str>) -> f64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or_default()
}

fn point(element: Element<'_>) -> Position {
    Position {
        x: decimal(element.attribute("x")),
        y: decimal(element.attribute("y")),
    }
}

fn position(element: Element<'_>) -> Option<Position> {
    element.child("position").map(point)
}

fn bundle(element: Element<'_>) -> Option<BundleCoordinate> {
    element.child("bundle").map(|b| {
        BundleCoordinate::new(
            b.child_text("group").unwrap_or_default().trim(),
            b.child_text("artifact").unwrap_or_default().trim(),
            b.child_text("version").unwrap_or_default().trim(),
        )
    })
}

fn properties(element: Element<'_>) -> Properties {
    element
        .children()
        .filter(|c| c.name() == "property")
        .map(|p| (text(p, "name"), optional_text(p, "value")))
        .collect()
}
