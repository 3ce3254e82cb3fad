//! Flow model extraction.

use crate::decode::{FieldLayout, FlowDecoder};
use crate::records::{ControllerServiceRecord, ProcessGroupRecord, ReportingTaskRecord};
use flowgate_core::EncodingVersion;
use flowgate_core::version::ENCODING_VERSION_ATTRIBUTE;
use flowgate_document::FlowDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Typed projection of a validated flow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowModel {
    /// Version declared on the root group, if any
    pub encoding_version: Option<EncodingVersion>,
    /// Layout the records were decoded with
    pub layout: FieldLayout,
    /// The root process group
    pub root_group: Option<ProcessGroupRecord>,
    /// First reporting task in the document
    pub reporting_task: Option<ReportingTaskRecord>,
    /// First controller service in the document
    pub controller_service: Option<ControllerServiceRecord>,
}

/// Project `doc` into records.
///
/// Only the first `rootGroup`, `reportingTask` and `controllerService`
/// elements in document order are decoded. The controller service may come
/// from inside a process group.
#[must_use]
pub fn extract(doc: &FlowDocument) -> FlowModel {
    let root = doc.root();
    let group_element = root.descendants_named("rootGroup").next();
    let encoding_version = group_element
        .and_then(|g| EncodingVersion::from_attribute(g.attribute(ENCODING_VERSION_ATTRIBUTE)));
    let decoder = FlowDecoder::for_version(encoding_version);

    let model = FlowModel {
        encoding_version,
        layout: decoder.layout(),
        root_group: group_element.map(|g| decoder.decode_process_group(g)),
        reporting_task: root
            .descendants_named("reportingTask")
            .next()
            .map(|t| decoder.decode_reporting_task(t)),
        controller_service: root
            .descendants_named("controllerService")
            .next()
            .map(|s| decoder.decode_controller_service(s)),
    };

    debug!(layout = %model.layout, "extracted flow model");
    model
}

impl FlowModel {
    /// Count every component in the root group, nested groups included
    #[must_use]
    pub fn summary(&self) -> FlowSummary {
        let mut summary = FlowSummary {
            reporting_task: self.reporting_task.is_some(),
            controller_service: self.controller_service.is_some(),
            ..FlowSummary::default()
        };

        let mut pending: Vec<&ProcessGroupRecord> = self.root_group.iter().collect();
        while let Some(group) = pending.pop() {
            let Some(contents) = &group.contents else {
                continue;
            };
            summary.processors += contents.processors.len();
            summary.connections += contents.connections.len();
            summary.funnels += contents.funnels.len();
            summary.labels += contents.labels.len();
            summary.input_ports += contents.input_ports.len();
            summary.output_ports += contents.output_ports.len();
            summary.process_groups += contents.process_groups.len();
            summary.remote_process_groups += contents.remote_process_groups.len();
            summary.controller_services += contents.controller_services.len();
            pending.extend(&contents.process_groups);
        }
        summary
    }
}

/// Component counts for a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Processors
    pub processors: usize,
    /// Connections
    pub connections: usize,
    /// Funnels
    pub funnels: usize,
    /// Labels
    pub labels: usize,
    /// Input ports
    pub input_ports: usize,
    /// Output ports
    pub output_ports: usize,
    /// Nested process groups, the root group excluded
    pub process_groups: usize,
    /// Remote process groups
    pub remote_process_groups: usize,
    /// Group-level controller services
    pub controller_services: usize,
    /// A reporting task was extracted
    pub reporting_task: bool,
    /// A controller-level service was extracted
    pub controller_service: bool,
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processors, {} connections, {} funnels, {} labels, {} input ports, {} output ports, \
             {} process groups, {} remote process groups, {} group controller services",
            self.processors,
            self.connections,
            self.funnels,
            self.labels,
            self.input_ports,
            self.output_ports,
            self.process_groups,
            self.remote_process_groups,
            self.controller_services
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_document::parse_flow_bytes;

    fn parse(xml: &str) -> FlowDocument {
        parse_flow_bytes(xml.as_bytes()).unwrap().unwrap()
    }

    #[test]
    fn test_extract_versioned_root_group() {
        let doc = parse(
            r#"<flowController>
                <rootGroup encoding-version="1.1">
                    <id>root</id><name>NiFi Flow</name>
                    <variable name="a" value="b"/>
                </rootGroup>
            </flowController>"#,
        );
        let model = extract(&doc);
        assert_eq!(model.encoding_version, Some(EncodingVersion::new(1, 1)));
        assert_eq!(model.layout, FieldLayout::V1Variables);
        assert_eq!(model.root_group.unwrap().variables.len(), 1);
        assert!(model.reporting_task.is_none());
        assert!(model.controller_service.is_none());
    }

    #[test]
    fn test_controller_version_does_not_select_layout() {
        let doc = parse(
            r#"<flowController encoding-version="1.3">
                <rootGroup><id>root</id><name>NiFi Flow</name></rootGroup>
            </flowController>"#,
        );
        let model = extract(&doc);
        assert_eq!(model.encoding_version, None);
        assert_eq!(model.layout, FieldLayout::Legacy);
    }

    #[test]
    fn test_first_task_and_service_win() {
        let doc = parse(
            r#"<flowController>
                <rootGroup><id>root</id><name>NiFi Flow</name></rootGroup>
                <controllerServices>
                    <controllerService><id>a</id><name>First</name><class>x.A</class></controllerService>
                    <controllerService><id>b</id><name>Second</name><class>x.B</class></controllerService>
                </controllerServices>
                <reportingTasks>
                    <reportingTask><id>r</id><name>Monitor</name><class>x.R</class></reportingTask>
                </reportingTasks>
            </flowController>"#,
        );
        let model = extract(&doc);
        assert_eq!(model.controller_service.unwrap().name, "First");
        assert_eq!(model.reporting_task.unwrap().name, "Monitor");
    }

    #[test]
    fn test_group_service_found_first() {
        let doc = parse(
            r#"<flowController>
                <rootGroup encoding-version="1.0">
                    <id>root</id><name>NiFi Flow</name>
                    <controllerService><id>g</id><name>Group</name><class>x.G</class></controllerService>
                </rootGroup>
                <controllerServices>
                    <controllerService><id>c</id><name>Controller</name><class>x.C</class></controllerService>
                </controllerServices>
            </flowController>"#,
        );
        assert_eq!(extract(&doc).controller_service.unwrap().name, "Group");
    }

    #[test]
    fn test_summary_counts_nested_groups() {
        let doc = parse(
            r#"<flowController>
                <rootGroup>
                    <id>root</id><name>NiFi Flow</name>
                    <funnel><id>f</id></funnel>
                    <processGroup>
                        <id>a</id><name>A</name>
                        <processGroup>
                            <id>b</id><name>B</name>
                            <processor><id>p</id><name>P</name><class>x.P</class></processor>
                        </processGroup>
                    </processGroup>
                </rootGroup>
            </flowController>"#,
        );
        let summary = extract(&doc).summary();
        assert_eq!(summary.processors, 1);
        assert_eq!(summary.funnels, 1);
        assert_eq!(summary.process_groups, 2);
        assert!(!summary.reporting_task);
        assert!(summary.to_string().starts_with("1 processors"));
    }
}
