//! The flow configuration schema.
//!
//! A fixed set of named element types. Each type declares its attributes and
//! a content model; children are matched by local name and counted against
//! their occurrence bounds. The schema has no target namespace, so any
//! element bound to a namespace is undeclared.

use crate::tree::{Element, FlowDocument};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::fmt;

/// The process-wide flow configuration schema
pub static FLOW_SCHEMA: Lazy<FlowSchema> = Lazy::new(FlowSchema::flow_configuration);

/// Value space for attribute values and text content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    /// Any text
    String,
    /// Optionally signed decimal digits
    Integer,
    /// Optionally signed digits with at most one decimal point
    Decimal,
    /// `true`, `false`, `1` or `0`
    Boolean,
}

impl SimpleType {
    /// Whether `value` is in this type's value space.
    ///
    /// Non-string types ignore surrounding whitespace.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::String => true,
            Self::Integer => {
                let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            Self::Decimal => {
                let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
                let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
                !(whole.is_empty() && fraction.is_empty())
                    && whole.bytes().all(|b| b.is_ascii_digit())
                    && fraction.bytes().all(|b| b.is_ascii_digit())
            }
            Self::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// Declared attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    /// Local name
    pub name: &'static str,
    /// Value type
    pub kind: SimpleType,
    /// Whether the attribute must be present
    pub required: bool,
}

/// Declared child element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDecl {
    /// Local name
    pub name: &'static str,
    /// Name of the element type governing the child
    pub type_name: &'static str,
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (`None` = unbounded)
    pub max: Option<u32>,
}

/// Content model of an element type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// No children, no text
    Empty,
    /// Text only
    Text(SimpleType),
    /// Declared child elements, in any order; whitespace between them is ignored
    Elements(Vec<ChildDecl>),
    /// Anything; neither attributes nor content are validated
    Any,
}

/// Named element type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementType {
    /// Type name
    pub name: &'static str,
    /// Declared attributes
    pub attributes: Vec<AttributeDecl>,
    /// Content model
    pub content: Content,
}

/// Schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// The document element is not the declared root
    UnexpectedRoot { found: String },
    /// Child not declared by the parent's type
    UndeclaredElement { parent: String, name: String },
    /// Required child missing or present too few times
    MissingElement { parent: String, name: String, min: u32 },
    /// Child present more often than allowed
    TooManyElements { parent: String, name: String, max: u32 },
    /// Attribute not declared by the element's type
    UndeclaredAttribute { element: String, name: String },
    /// Required attribute missing
    MissingAttribute { element: String, name: String },
    /// Attribute value outside its type
    InvalidAttribute { element: String, name: String, kind: SimpleType, value: String },
    /// Character data where the content model forbids it
    UnexpectedText { element: String },
    /// Text content outside its type
    InvalidText { element: String, kind: SimpleType, value: String },
    /// Schema references a type it does not define
    UnknownType { name: String },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedRoot { found } => {
                write!(f, "Cannot find the declaration of element '{}'", found)
            }
            Self::UndeclaredElement { parent, name } => {
                write!(f, "Element '{}' is not allowed in '{}'", name, parent)
            }
            Self::MissingElement { parent, name, min } => {
                write!(f, "Element '{}' requires at least {} '{}'", parent, min, name)
            }
            Self::TooManyElements { parent, name, max } => {
                write!(f, "Element '{}' allows at most {} '{}'", parent, max, name)
            }
            Self::UndeclaredAttribute { element, name } => {
                write!(f, "Attribute '{}' is not allowed on '{}'", name, element)
            }
            Self::MissingAttribute { element, name } => {
                write!(f, "Attribute '{}' is required on '{}'", name, element)
            }
            Self::InvalidAttribute { element, name, kind, value } => write!(
                f,
                "Value '{}' of attribute '{}' on '{}' is not a valid {}",
                value, name, element, kind
            ),
            Self::UnexpectedText { element } => {
                write!(f, "Element '{}' must not contain character data", element)
            }
            Self::InvalidText { element, kind, value } => write!(
                f,
                "Value '{}' of element '{}' is not a valid {}",
                value, element, kind
            ),
            Self::UnknownType { name } => write!(f, "Schema type '{}' is not defined", name),
        }
    }
}

impl std::error::Error for SchemaViolation {}

/// A complete schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSchema {
    version: &'static str,
    root_name: &'static str,
    root_type: &'static str,
    types: IndexMap<&'static str, ElementType>,
}

impl FlowSchema {
    /// Revision of the flow configuration schema
    pub const VERSION: &'static str = "1.3";

    /// Create an empty schema with the given document element
    #[must_use]
    pub fn new(version: &'static str, root_name: &'static str, root_type: &'static str) -> Self {
        Self {
            version,
            root_name,
            root_type,
            types: IndexMap::new(),
        }
    }

    /// Add a type definition
    #[must_use]
    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.types.insert(element_type.name, element_type);
        self
    }

    /// Schema revision
    #[must_use]
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Name of the document element
    #[must_use]
    pub fn root_name(&self) -> &'static str {
        self.root_name
    }

    /// Look up a type definition
    #[must_use]
    pub fn element_type(&self, name: &str) -> Option<&ElementType> {
        self.types.get(name)
    }

    /// Validate a document.
    ///
    /// Elements are checked in document order and the first violation is
    /// returned together with the offending element.
    ///
    /// # Errors
    ///
    /// Returns the first violation found
    pub fn validate<'d>(&self, doc: &'d FlowDocument) -> Result<(), (Element<'d>, SchemaViolation)> {
        let root = doc.root();
        if root.name() != self.root_name || root.namespace().is_some() {
            return Err((
                root,
                SchemaViolation::UnexpectedRoot {
                    found: qualified_name(root),
                },
            ));
        }

        let mut stack = vec![(root, self.lookup(self.root_type).map_err(|v| (root, v))?)];
        while let Some((element, element_type)) = stack.pop() {
            let children = self
                .check_element(element, element_type)
                .map_err(|v| (element, v))?;
            // reversed so the stack yields children in document order
            for (child, type_name) in children.into_iter().rev() {
                let child_type = self.lookup(type_name).map_err(|v| (child, v))?;
                stack.push((child, child_type));
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&ElementType, SchemaViolation> {
        self.types.get(name).ok_or_else(|| SchemaViolation::UnknownType {
            name: name.to_string(),
        })
    }

    /// Check one element, returning its children paired with their type names
    fn check_element<'d>(
        &self,
        element: Element<'d>,
        element_type: &ElementType,
    ) -> Result<Vec<(Element<'d>, &'static str)>, SchemaViolation> {
        if element_type.content == Content::Any {
            return Ok(Vec::new());
        }

        check_attributes(element, element_type)?;

        match &element_type.content {
            Content::Any => Ok(Vec::new()),
            Content::Empty => {
                if let Some(child) = element.children().next() {
                    return Err(SchemaViolation::UndeclaredElement {
                        parent: element.name().to_string(),
                        name: qualified_name(child),
                    });
                }
                if !element.text().trim().is_empty() {
                    return Err(SchemaViolation::UnexpectedText {
                        element: element.name().to_string(),
                    });
                }
                Ok(Vec::new())
            }
            Content::Text(kind) => {
                if let Some(child) = element.children().next() {
                    return Err(SchemaViolation::UndeclaredElement {
                        parent: element.name().to_string(),
                        name: qualified_name(child),
                    });
                }
                if !kind.accepts(element.text()) {
                    return Err(SchemaViolation::InvalidText {
                        element: element.name().to_string(),
                        kind: *kind,
                        value: element.text().to_string(),
                    });
                }
                Ok(Vec::new())
            }
            Content::Elements(decls) => {
                if !element.text().trim().is_empty() {
                    return Err(SchemaViolation::UnexpectedText {
                        element: element.name().to_string(),
                    });
                }
                check_children(element, decls)
            }
        }
    }

    /// The flow configuration schema
    #[must_use]
    pub fn flow_configuration() -> Self {
        use SimpleType::{Boolean, Decimal, Integer};

        Self::new(Self::VERSION, "flowController", "FlowControllerType")
            // simple content
            .with_type(text_type("StringType", SimpleType::String))
            .with_type(text_type("IntegerType", Integer))
            .with_type(text_type("BooleanType", Boolean))
            .with_type(ElementType {
                name: "PositionType",
                attributes: vec![required_attr("x", Decimal), required_attr("y", Decimal)],
                content: Content::Empty,
            })
            .with_type(ElementType {
                name: "SizeType",
                attributes: vec![
                    required_attr("width", Decimal),
                    required_attr("height", Decimal),
                ],
                content: Content::Empty,
            })
            .with_type(ElementType {
                name: "VariableType",
                attributes: vec![
                    required_attr("name", SimpleType::String),
                    optional_attr("value", SimpleType::String),
                ],
                content: Content::Empty,
            })
            .with_type(ElementType {
                name: "AnyType",
                attributes: Vec::new(),
                content: Content::Any,
            })
            // controller
            .with_type(elements(
                "FlowControllerType",
                vec![optional_attr("encoding-version", SimpleType::String)],
                vec![
                    optional("maxThreadCount", "IntegerType"),
                    optional("maxTimerDrivenThreadCount", "IntegerType"),
                    optional("maxEventDrivenThreadCount", "IntegerType"),
                    optional("registries", "RegistriesType"),
                    one("rootGroup", "RootProcessGroupType"),
                    optional("controllerServices", "ControllerServicesType"),
                    optional("reportingTasks", "ReportingTasksType"),
                ],
            ))
            .with_type(elements(
                "RegistriesType",
                Vec::new(),
                vec![many("flowRegistry", "FlowRegistryType")],
            ))
            .with_type(elements(
                "FlowRegistryType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    one("name", "StringType"),
                    one("url", "StringType"),
                    optional("description", "StringType"),
                ],
            ))
            // groups
            .with_type(elements(
                "RootProcessGroupType",
                vec![optional_attr("encoding-version", SimpleType::String)],
                process_group_children(),
            ))
            .with_type(elements("ProcessGroupType", Vec::new(), process_group_children()))
            // components
            .with_type(elements(
                "ProcessorType",
                Vec::new(),
                component_children(vec![
                    optional("position", "PositionType"),
                    optional("styles", "AnyType"),
                    optional("comment", "StringType"),
                    optional("maxConcurrentTasks", "IntegerType"),
                    optional("schedulingPeriod", "StringType"),
                    optional("penalizationPeriod", "StringType"),
                    optional("yieldPeriod", "StringType"),
                    optional("bulletinLevel", "StringType"),
                    optional("lossTolerant", "BooleanType"),
                    optional("scheduledState", "StringType"),
                    optional("schedulingStrategy", "StringType"),
                    optional("executionNode", "StringType"),
                    optional("runDurationNanos", "IntegerType"),
                    optional("annotationData", "StringType"),
                    many("autoTerminatedRelationship", "StringType"),
                ]),
            ))
            .with_type(elements(
                "ControllerServiceType",
                Vec::new(),
                component_children(vec![
                    optional("comment", "StringType"),
                    optional("enabled", "BooleanType"),
                    optional("annotationData", "StringType"),
                ]),
            ))
            .with_type(elements(
                "ReportingTaskType",
                Vec::new(),
                component_children(vec![
                    optional("comment", "StringType"),
                    optional("schedulingPeriod", "StringType"),
                    optional("scheduledState", "StringType"),
                    optional("schedulingStrategy", "StringType"),
                    optional("annotationData", "StringType"),
                ]),
            ))
            .with_type(elements(
                "ControllerServicesType",
                Vec::new(),
                vec![many("controllerService", "ControllerServiceType")],
            ))
            .with_type(elements(
                "ReportingTasksType",
                Vec::new(),
                vec![many("reportingTask", "ReportingTaskType")],
            ))
            .with_type(elements(
                "BundleType",
                Vec::new(),
                vec![
                    one("group", "StringType"),
                    one("artifact", "StringType"),
                    one("version", "StringType"),
                ],
            ))
            .with_type(elements(
                "PropertyType",
                Vec::new(),
                vec![one("name", "StringType"), optional("value", "StringType")],
            ))
            .with_type(elements(
                "PortType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    one("name", "StringType"),
                    optional("position", "PositionType"),
                    optional("comments", "StringType"),
                    optional("scheduledState", "StringType"),
                    optional("maxConcurrentTasks", "IntegerType"),
                    many("userAccessControl", "StringType"),
                    many("groupAccessControl", "StringType"),
                ],
            ))
            .with_type(elements(
                "LabelType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    optional("position", "PositionType"),
                    optional("size", "SizeType"),
                    optional("styles", "AnyType"),
                    optional("value", "StringType"),
                ],
            ))
            .with_type(elements(
                "FunnelType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    optional("position", "PositionType"),
                ],
            ))
            .with_type(elements(
                "RemoteProcessGroupType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    one("name", "StringType"),
                    optional("position", "PositionType"),
                    optional("comment", "StringType"),
                    optional("url", "StringType"),
                    optional("urls", "StringType"),
                    optional("timeout", "StringType"),
                    optional("yieldPeriod", "StringType"),
                    optional("transmitting", "BooleanType"),
                    optional("transportProtocol", "StringType"),
                    optional("proxyHost", "StringType"),
                    optional("proxyPort", "IntegerType"),
                    optional("proxyUser", "StringType"),
                    optional("proxyPassword", "StringType"),
                    optional("networkInterface", "StringType"),
                    many("inputPort", "RemotePortType"),
                    many("outputPort", "RemotePortType"),
                ],
            ))
            .with_type(elements(
                "RemotePortType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    optional("targetId", "StringType"),
                    one("name", "StringType"),
                    optional("position", "PositionType"),
                    optional("comments", "StringType"),
                    optional("scheduledState", "StringType"),
                    optional("maxConcurrentTasks", "IntegerType"),
                    optional("useCompression", "BooleanType"),
                    optional("batchCount", "IntegerType"),
                    optional("batchSize", "StringType"),
                    optional("batchDuration", "StringType"),
                    optional("connected", "BooleanType"),
                    optional("transmitting", "BooleanType"),
                ],
            ))
            .with_type(elements(
                "ConnectionType",
                Vec::new(),
                vec![
                    one("id", "StringType"),
                    optional("versionedComponentId", "StringType"),
                    one("name", "StringType"),
                    optional("bendPoints", "BendPointsType"),
                    optional("labelIndex", "IntegerType"),
                    optional("zIndex", "IntegerType"),
                    one("sourceId", "StringType"),
                    one("sourceGroupId", "StringType"),
                    one("sourceType", "StringType"),
                    one("destinationId", "StringType"),
                    one("destinationGroupId", "StringType"),
                    one("destinationType", "StringType"),
                    many("relationship", "StringType"),
                    optional("maxWorkQueueSize", "IntegerType"),
                    optional("maxWorkQueueDataSize", "StringType"),
                    optional("flowFileExpiration", "StringType"),
                    many("queuePrioritizerClass", "StringType"),
                    optional("loadBalanceStrategy", "StringType"),
                    optional("partitioningAttribute", "StringType"),
                    optional("loadBalanceCompression", "StringType"),
                ],
            ))
            .with_type(elements(
                "BendPointsType",
                Vec::new(),
                vec![many("bendPoint", "PositionType")],
            ))
    }
}

fn qualified_name(element: Element<'_>) -> String {
    match element.namespace() {
        Some(ns) => format!("{{{}}}{}", ns, element.name()),
        None => element.name().to_string(),
    }
}

fn check_attributes(element: Element<'_>, element_type: &ElementType) -> Result<(), SchemaViolation> {
    for (name, value) in element.attributes() {
        let decl = element_type
            .attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| SchemaViolation::UndeclaredAttribute {
                element: element.name().to_string(),
                name: name.to_string(),
            })?;
        if !decl.kind.accepts(value) {
            return Err(SchemaViolation::InvalidAttribute {
                element: element.name().to_string(),
                name: name.to_string(),
                kind: decl.kind,
                value: value.to_string(),
            });
        }
    }

    for decl in element_type.attributes.iter().filter(|a| a.required) {
        if element.attribute(decl.name).is_none() {
            return Err(SchemaViolation::MissingAttribute {
                element: element.name().to_string(),
                name: decl.name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_children<'d>(
    element: Element<'d>,
    decls: &[ChildDecl],
) -> Result<Vec<(Element<'d>, &'static str)>, SchemaViolation> {
    let mut counts = vec![0u32; decls.len()];
    let mut typed = Vec::new();

    for child in element.children() {
        let index = match child.namespace() {
            None => decls.iter().position(|d| d.name == child.name()),
            Some(_) => None,
        }
        .ok_or_else(|| SchemaViolation::UndeclaredElement {
            parent: element.name().to_string(),
            name: qualified_name(child),
        })?;

        let decl = &decls[index];
        counts[index] += 1;
        if let Some(max) = decl.max
            && counts[index] > max
        {
            return Err(SchemaViolation::TooManyElements {
                parent: element.name().to_string(),
                name: decl.name.to_string(),
                max,
            });
        }
        typed.push((child, decl.type_name));
    }

    for (decl, count) in decls.iter().zip(&counts) {
        if *count < decl.min {
            return Err(SchemaViolation::MissingElement {
                parent: element.name().to_string(),
                name: decl.name.to_string(),
                min: decl.min,
            });
        }
    }
    Ok(typed)
}

fn text_type(name: &'static str, kind: SimpleType) -> ElementType {
    ElementType {
        name,
        attributes: Vec::new(),
        content: Content::Text(kind),
    }
}

fn elements(
    name: &'static str,
    attributes: Vec<AttributeDecl>,
    children: Vec<ChildDecl>,
) -> ElementType {
    ElementType {
        name,
        attributes,
        content: Content::Elements(children),
    }
}

fn required_attr(name: &'static str, kind: SimpleType) -> AttributeDecl {
    AttributeDecl {
        name,
        kind,
        required: true,
    }
}

fn optional_attr(name: &'static str, kind: SimpleType) -> AttributeDecl {
    AttributeDecl {
        name,
        kind,
        required: false,
    }
}

fn one(name: &'static str, type_name: &'static str) -> ChildDecl {
    ChildDecl {
        name,
        type_name,
        min: 1,
        max: Some(1),
    }
}

fn optional(name: &'static str, type_name: &'static str) -> ChildDecl {
    ChildDecl {
        name,
        type_name,
        min: 0,
        max: Some(1),
    }
}

fn many(name: &'static str, type_name: &'static str) -> ChildDecl {
    ChildDecl {
        name,
        type_name,
        min: 0,
        max: None,
    }
}

fn process_group_children() -> Vec<ChildDecl> {
    vec![
        one("id", "StringType"),
        optional("versionedComponentId", "StringType"),
        one("name", "StringType"),
        optional("position", "PositionType"),
        optional("comment", "StringType"),
        optional("versionControlInformation", "AnyType"),
        many("processor", "ProcessorType"),
        many("inputPort", "PortType"),
        many("outputPort", "PortType"),
        many("label", "LabelType"),
        many("funnel", "FunnelType"),
        many("processGroup", "ProcessGroupType"),
        many("remoteProcessGroup", "RemoteProcessGroupType"),
        many("connection", "ConnectionType"),
        many("controllerService", "ControllerServiceType"),
        many("template", "AnyType"),
        many("variable", "VariableType"),
    ]
}

/// Fields shared by processors, controller services and reporting tasks
fn component_children(extra: Vec<ChildDecl>) -> Vec<ChildDecl> {
    let mut children = vec![
        one("id", "StringType"),
        optional("versionedComponentId", "StringType"),
        one("name", "StringType"),
        one("class", "StringType"),
        optional("bundle", "BundleType"),
        many("property", "PropertyType"),
    ];
    children.extend(extra);
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_schema_is_closed() {
        // every referenced type is defined
        for element_type in FLOW_SCHEMA.types.values() {
            if let Content::Elements(decls) = &element_type.content {
                for decl in decls {
                    assert!(
                        FLOW_SCHEMA.element_type(decl.type_name).is_some(),
                        "{} references undefined {}",
                        element_type.name,
                        decl.type_name
                    );
                }
            }
        }
        assert!(FLOW_SCHEMA.element_type("FlowControllerType").is_some());
    }

    #[test]
    fn test_schema_version() {
        assert_eq!(FLOW_SCHEMA.version(), "1.3");
        assert_eq!(FLOW_SCHEMA.root_name(), "flowController");
    }

    #[test]
    fn test_simple_types() {
        assert!(SimpleType::Integer.accepts(" 42 "));
        assert!(SimpleType::Integer.accepts("-7"));
        assert!(!SimpleType::Integer.accepts("4.2"));
        assert!(!SimpleType::Integer.accepts(""));
        assert!(!SimpleType::Integer.accepts("+"));

        assert!(SimpleType::Decimal.accepts("12.5"));
        assert!(SimpleType::Decimal.accepts("-.5"));
        assert!(SimpleType::Decimal.accepts("3."));
        assert!(!SimpleType::Decimal.accepts("."));
        assert!(!SimpleType::Decimal.accepts("1e5"));
        assert!(!SimpleType::Decimal.accepts("NaN"));

        assert!(SimpleType::Boolean.accepts("true"));
        assert!(SimpleType::Boolean.accepts("0"));
        assert!(!SimpleType::Boolean.accepts("yes"));

        assert!(SimpleType::String.accepts(""));
    }

    #[test]
    fn test_violation_display() {
        let v = SchemaViolation::UndeclaredElement {
            parent: "rootGroup".to_string(),
            name: "widget".to_string(),
        };
        assert_eq!(v.to_string(), "Element 'widget' is not allowed in 'rootGroup'");
    }

    proptest! {
        #[test]
        fn prop_integers_accepted(n: i64) {
            prop_assert!(SimpleType::Integer.accepts(&n.to_string()));
            prop_assert!(SimpleType::Decimal.accepts(&n.to_string()));
        }
    }
}
