//! Decoded flow records.
//!
//! Records are owned copies of what the document declares. They hold no
//! reference back into the tree, which can be dropped once decoding is done.

use flowgate_core::BundleCoordinate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Component properties, in declaration order. A property without a value
/// is explicitly unset.
pub type Properties = IndexMap<String, Option<String>>;

/// Canvas position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// Canvas size of a label
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in canvas units
    pub width: f64,
    /// Height in canvas units
    pub height: f64,
}

/// Decoded process group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessGroupRecord {
    /// Group id
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form comments
    pub comments: Option<String>,
    /// Canvas position
    pub position: Option<Position>,
    /// Group variables (only decoded by layouts that support them)
    pub variables: IndexMap<String, Option<String>>,
    /// Group contents. The decoder always fills this in.
    pub contents: Option<FlowSnippet>,
}

/// Everything a process group directly contains
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowSnippet {
    /// Processors
    pub processors: Vec<ProcessorRecord>,
    /// Connections between components
    pub connections: Vec<ConnectionRecord>,
    /// Funnels
    pub funnels: Vec<FunnelRecord>,
    /// Canvas labels
    pub labels: Vec<LabelRecord>,
    /// Input ports
    pub input_ports: Vec<PortRecord>,
    /// Output ports
    pub output_ports: Vec<PortRecord>,
    /// Nested process groups
    pub process_groups: Vec<ProcessGroupRecord>,
    /// Remote process groups
    pub remote_process_groups: Vec<RemoteProcessGroupRecord>,
    /// Group-level controller services
    pub controller_services: Vec<ControllerServiceRecord>,
}

impl Drop for FlowSnippet {
    // Nested groups are released from a work list so deep nesting cannot
    // exhaust the stack.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.process_groups);
        while let Some(mut group) = pending.pop() {
            if let Some(contents) = group.contents.as_mut() {
                pending.append(&mut contents.process_groups);
            }
        }
    }
}

/// Decoded processor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessorRecord {
    /// Processor id
    pub id: String,
    /// Display name
    pub name: String,
    /// Fully qualified component type
    pub component_type: String,
    /// Bundle providing the type
    pub bundle: Option<BundleCoordinate>,
    /// Canvas position
    pub position: Option<Position>,
    /// Free-form comments
    pub comments: Option<String>,
    /// Configured properties
    pub properties: Properties,
    /// Concurrent task limit
    pub max_concurrent_tasks: Option<i64>,
    /// Run schedule, e.g. `0 sec`
    pub scheduling_period: Option<String>,
    /// Scheduling strategy name
    pub scheduling_strategy: Option<String>,
    /// `RUNNING`, `STOPPED` or `DISABLED`
    pub scheduled_state: Option<String>,
    /// Relationships dropped on completion
    pub auto_terminated_relationships: Vec<String>,
}

/// Decoded connection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Connection id
    pub id: String,
    /// Display name, often blank
    pub name: String,
    /// Source component id
    pub source_id: String,
    /// Group holding the source
    pub source_group_id: String,
    /// Source component kind
    pub source_type: String,
    /// Destination component id
    pub destination_id: String,
    /// Group holding the destination
    pub destination_group_id: String,
    /// Destination component kind
    pub destination_type: String,
    /// Selected relationships
    pub relationships: Vec<String>,
    /// Canvas bend points
    pub bend_points: Vec<Position>,
    /// Back pressure object threshold
    pub max_work_queue_size: Option<i64>,
    /// Back pressure data size threshold
    pub max_work_queue_data_size: Option<String>,
    /// Queued data expiration
    pub flow_file_expiration: Option<String>,
    /// Prioritizer types, in order
    pub prioritizers: Vec<String>,
}

/// Decoded funnel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunnelRecord {
    /// Funnel id
    pub id: String,
    /// Canvas position
    pub position: Option<Position>,
}

/// Decoded label
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Label id
    pub id: String,
    /// Label text
    pub value: Option<String>,
    /// Canvas position
    pub position: Option<Position>,
    /// Canvas size
    pub size: Option<Size>,
}

/// Decoded input or output port
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortRecord {
    /// Port id
    pub id: String,
    /// Display name
    pub name: String,
    /// Canvas position
    pub position: Option<Position>,
    /// Free-form comments
    pub comments: Option<String>,
    /// `RUNNING`, `STOPPED` or `DISABLED`
    pub scheduled_state: Option<String>,
    /// Concurrent task limit
    pub max_concurrent_tasks: Option<i64>,
}

/// Decoded port of a remote process group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemotePortRecord {
    /// Local port id
    pub id: String,
    /// Port id on the remote instance
    pub target_id: Option<String>,
    /// Display name
    pub name: String,
    /// Free-form comments
    pub comments: Option<String>,
    /// Concurrent task limit
    pub max_concurrent_tasks: Option<i64>,
    /// Compress transferred data
    pub use_compression: bool,
    /// Transmission enabled
    pub transmitting: bool,
}

/// Decoded remote process group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteProcessGroupRecord {
    /// Group id
    pub id: String,
    /// Display name
    pub name: String,
    /// Comma separated target URIs
    pub target_uris: Option<String>,
    /// Canvas position
    pub position: Option<Position>,
    /// Free-form comments
    pub comments: Option<String>,
    /// Communication timeout
    pub communications_timeout: Option<String>,
    /// Back-off after a failed transfer
    pub yield_duration: Option<String>,
    /// `RAW` or `HTTP`
    pub transport_protocol: Option<String>,
    /// Transmission enabled
    pub transmitting: bool,
    /// Remote input ports
    pub input_ports: Vec<RemotePortRecord>,
    /// Remote output ports
    pub output_ports: Vec<RemotePortRecord>,
}

/// Decoded reporting task
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportingTaskRecord {
    /// Task id
    pub id: String,
    /// Display name
    pub name: String,
    /// Fully qualified component type
    pub component_type: String,
    /// Bundle providing the type
    pub bundle: Option<BundleCoordinate>,
    /// Free-form comments
    pub comments: Option<String>,
    /// Configured properties
    pub properties: Properties,
    /// Run schedule
    pub scheduling_period: Option<String>,
    /// Scheduling strategy name
    pub scheduling_strategy: Option<String>,
    /// `RUNNING`, `STOPPED` or `DISABLED`
    pub scheduled_state: Option<String>,
}

/// Decoded controller service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerServiceRecord {
    /// Service id
    pub id: String,
    /// Display name
    pub name: String,
    /// Fully qualified component type
    pub component_type: String,
    /// Bundle providing the type
    pub bundle: Option<BundleCoordinate>,
    /// Free-form comments
    pub comments: Option<String>,
    /// Configured properties
    pub properties: Properties,
    /// Whether the service is enabled
    pub enabled: bool,
}
