//! Namespace-aware, schema-validating flow parser.

use crate::handler::{ErrorHandler, LoggingErrorHandler, ParseIssue, Severity};
use crate::schema::FLOW_SCHEMA;
use crate::tree::{FlowDocument, TreeBuilder};
use flowgate_core::FlowError;
use indexmap::IndexMap;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use thiserror::Error;
use tracing::debug;

/// Malformed or non-conforming flow bytes
#[derive(Debug, Clone, Error)]
#[error("flow configuration rejected: {issue}")]
pub struct SerializationError {
    issue: ParseIssue,
}

impl SerializationError {
    /// The issue that aborted the parse
    #[must_use]
    pub fn issue(&self) -> &ParseIssue {
        &self.issue
    }

    /// Whether the input was well-formed XML that failed schema validation
    #[must_use]
    pub fn is_schema_violation(&self) -> bool {
        self.issue.severity == Severity::Error
    }
}

impl From<SerializationError> for FlowError {
    fn from(err: SerializationError) -> Self {
        FlowError::serialization(err)
    }
}

/// Parse and validate flow bytes with the default logging handler.
///
/// Empty input means "no flow" and yields `Ok(None)`.
///
/// # Errors
///
/// Returns error if the bytes are not well-formed or do not conform to
/// [`FLOW_SCHEMA`]
pub fn parse_flow_bytes(bytes: &[u8]) -> Result<Option<FlowDocument>, SerializationError> {
    FlowParser::new().parse(bytes)
}

/// Flow parser
pub struct FlowParser {
    handler: Box<dyn ErrorHandler>,
}

impl FlowParser {
    /// Create a parser that logs issues
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: Box::new(LoggingErrorHandler::default()),
        }
    }

    /// Route issues through a custom handler
    #[must_use]
    pub fn with_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Parse and validate `bytes`.
    ///
    /// Every issue is reported to the handler. Warnings let the parse
    /// continue; the first error or fatal error aborts it.
    ///
    /// # Errors
    ///
    /// Returns error on the first well-formedness or schema violation
    pub fn parse(&self, bytes: &[u8]) -> Result<Option<FlowDocument>, SerializationError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let doc = self.build(bytes)?;
        if let Err((element, violation)) = FLOW_SCHEMA.validate(&doc) {
            let offset = element.offset();
            return Err(self.abort(ParseIssue::at(
                Severity::Error,
                violation.to_string(),
                bytes,
                offset,
            )));
        }

        debug!(
            elements = doc.len(),
            schema = FLOW_SCHEMA.version(),
            "parsed flow configuration"
        );
        Ok(Some(doc))
    }

    /// Build the element tree, checking well-formedness only
    fn build(&self, bytes: &[u8]) -> Result<FlowDocument, SerializationError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        let mut builder = TreeBuilder::new();

        loop {
            let offset = position(reader.buffer_position());
            let event = reader.read_event().map_err(|err| {
                let at = position(reader.error_position());
                self.fatal(err.to_string(), bytes, at)
            })?;

            match event {
                Event::Start(start) => {
                    self.open(&reader, &mut builder, &start, bytes, offset)?;
                }
                Event::Empty(start) => {
                    self.open(&reader, &mut builder, &start, bytes, offset)?;
                    builder
                        .close()
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                }
                Event::End(_) => {
                    builder
                        .close()
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                    builder
                        .text(&text)
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    let text = std::str::from_utf8(&data)
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                    builder
                        .text(text)
                        .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
                }
                Event::DocType(_) => {
                    let issue = ParseIssue::at(
                        Severity::Warning,
                        "DOCTYPE declaration ignored",
                        bytes,
                        offset,
                    );
                    self.handler.warning(&issue);
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            }
        }

        let end = bytes.len();
        builder
            .finish()
            .map_err(|err| self.fatal(err.to_string(), bytes, end))
    }

    fn open(
        &self,
        reader: &NsReader<&[u8]>,
        builder: &mut TreeBuilder,
        start: &BytesStart<'_>,
        bytes: &[u8],
        offset: usize,
    ) -> Result<(), SerializationError> {
        let (resolved, local) = reader.resolve_element(start.name());
        let name = utf8(local.as_ref()).map_err(|msg| self.fatal(msg, bytes, offset))?;
        let namespace = match resolved {
            ResolveResult::Unbound => None,
            ResolveResult::Bound(ns) => {
                Some(utf8(ns.as_ref()).map_err(|msg| self.fatal(msg, bytes, offset))?)
            }
            ResolveResult::Unknown(prefix) => {
                let message = format!(
                    "The prefix \"{}\" for element \"{}\" is not bound",
                    String::from_utf8_lossy(&prefix),
                    name
                );
                return Err(self.fatal(message, bytes, offset));
            }
        };

        let mut attributes = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }

            let (resolved, local) = reader.resolve_attribute(attr.key);
            let local = utf8(local.as_ref()).map_err(|msg| self.fatal(msg, bytes, offset))?;
            let key = match resolved {
                ResolveResult::Unbound => local,
                ResolveResult::Bound(ns) => {
                    let ns = utf8(ns.as_ref()).map_err(|msg| self.fatal(msg, bytes, offset))?;
                    format!("{{{}}}{}", ns, local)
                }
                ResolveResult::Unknown(prefix) => {
                    let message = format!(
                        "The prefix \"{}\" for attribute \"{}\" on element \"{}\" is not bound",
                        String::from_utf8_lossy(&prefix),
                        local,
                        name
                    );
                    return Err(self.fatal(message, bytes, offset));
                }
            };

            let value = attr
                .unescape_value()
                .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
            if attributes.insert(key.clone(), value.into_owned()).is_some() {
                let message = format!("Attribute \"{}\" was already specified for element \"{}\"", key, name);
                return Err(self.fatal(message, bytes, offset));
            }
        }

        builder
            .open(name, namespace, attributes, offset)
            .map_err(|err| self.fatal(err.to_string(), bytes, offset))?;
        Ok(())
    }

    fn fatal(&self, message: impl Into<String>, bytes: &[u8], offset: usize) -> SerializationError {
        self.abort(ParseIssue::at(Severity::Fatal, message, bytes, offset))
    }

    /// Report an aborting issue and turn it into the parse result
    fn abort(&self, issue: ParseIssue) -> SerializationError {
        match issue.severity {
            Severity::Fatal => self.handler.fatal_error(&issue),
            _ => self.handler.error(&issue),
        }
        SerializationError { issue }
    }
}

impl Default for FlowParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlowParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowParser").finish_non_exhaustive()
    }
}

fn utf8(raw: &[u8]) -> Result<String, String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|err| format!("Invalid UTF-8 in name: {}", err))
}

fn position(pos: u64) -> usize {
    usize::try_from(pos).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CollectingErrorHandler;
    use std::sync::Arc;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<flowController encoding-version="1.3">
  <maxThreadCount>10</maxThreadCount>
  <rootGroup encoding-version="1.3">
    <id>root</id>
    <name>NiFi Flow</name>
    <position x="0.0" y="0.0"/>
  </rootGroup>
</flowController>"#;

    /// Shares a collector with the parser so the test can inspect it afterwards
    #[derive(Clone, Default)]
    struct SharedCollector(Arc<CollectingErrorHandler>);

    impl ErrorHandler for SharedCollector {
        fn warning(&self, issue: &ParseIssue) {
            self.0.warning(issue);
        }
        fn error(&self, issue: &ParseIssue) {
            self.0.error(issue);
        }
        fn fatal_error(&self, issue: &ParseIssue) {
            self.0.fatal_error(issue);
        }
    }

    #[test]
    fn test_empty_input_is_no_document() {
        assert!(parse_flow_bytes(b"").unwrap().is_none());
    }

    #[test]
    fn test_parse_minimal_flow() {
        let doc = parse_flow_bytes(MINIMAL.as_bytes()).unwrap().unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "flowController");
        assert_eq!(root.attribute("encoding-version"), Some("1.3"));

        let group = root.child("rootGroup").unwrap();
        assert_eq!(group.child_text("name"), Some("NiFi Flow"));
        assert_eq!(group.child("position").unwrap().attribute("x"), Some("0.0"));
    }

    #[test]
    fn test_unknown_root_rejected() {
        let err = parse_flow_bytes(b"<flowControllerX/>").unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.issue().message.contains("flowControllerX"));
    }

    #[test]
    fn test_missing_root_group_rejected() {
        let err = parse_flow_bytes(b"<flowController></flowController>").unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.issue().message.contains("rootGroup"));
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        let err = parse_flow_bytes(b"<flowController><rootGroup></flowController>").unwrap_err();
        assert_eq!(err.issue().severity, Severity::Fatal);

        let err = parse_flow_bytes(b"<flowController>").unwrap_err();
        assert_eq!(err.issue().severity, Severity::Fatal);

        let err = parse_flow_bytes(b"   ").unwrap_err();
        assert_eq!(err.issue().severity, Severity::Fatal);
    }

    #[test]
    fn test_second_root_is_fatal() {
        let input = MINIMAL.to_string() + "<flowController/>";
        let err = parse_flow_bytes(input.as_bytes()).unwrap_err();
        assert_eq!(err.issue().severity, Severity::Fatal);
    }

    #[test]
    fn test_unbound_prefix_is_fatal() {
        let err = parse_flow_bytes(b"<x:flowController/>").unwrap_err();
        assert_eq!(err.issue().severity, Severity::Fatal);
        assert!(err.issue().message.contains("not bound"));
    }

    #[test]
    fn test_namespaced_root_rejected() {
        let input = br#"<flowController xmlns="urn:other"><rootGroup><id>a</id><name>b</name></rootGroup></flowController>"#;
        let err = parse_flow_bytes(input).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.issue().message.contains("{urn:other}flowController"));
    }

    #[test]
    fn test_namespace_declarations_are_not_attributes() {
        let input = br#"<flowController xmlns:ext="urn:ext"><rootGroup><id>a</id><name>b</name></rootGroup></flowController>"#;
        let doc = parse_flow_bytes(input).unwrap().unwrap();
        assert_eq!(doc.root().attributes().count(), 0);
    }

    #[test]
    fn test_undeclared_child_rejected() {
        let input = br#"<flowController><rootGroup><id>a</id><name>b</name><widget/></rootGroup></flowController>"#;
        let err = parse_flow_bytes(input).unwrap_err();
        assert!(err.issue().message.contains("widget"));
    }

    #[test]
    fn test_ill_typed_text_rejected() {
        let input = br#"<flowController><maxThreadCount>many</maxThreadCount><rootGroup><id>a</id><name>b</name></rootGroup></flowController>"#;
        let err = parse_flow_bytes(input).unwrap_err();
        assert!(err.is_schema_violation());
        assert_eq!(err.issue().line, 1);
    }

    #[test]
    fn test_error_location() {
        let input = "<flowController>\n  <rootGroup>\n    <id>a</id>\n    <name>b</name>\n    <bogus/>\n  </rootGroup>\n</flowController>";
        let err = parse_flow_bytes(input.as_bytes()).unwrap_err();
        assert_eq!(err.issue().line, 2);
        assert_eq!(err.issue().column, 3);
    }

    #[test]
    fn test_template_content_not_validated() {
        let input = br#"<flowController><rootGroup><id>a</id><name>b</name>
            <template><anything goes="here"><processor/></anything></template>
        </rootGroup></flowController>"#;
        assert!(parse_flow_bytes(input).unwrap().is_some());
    }

    #[test]
    fn test_entities_unescaped() {
        let input = br#"<flowController><rootGroup><id>a</id><name>A &amp; B</name></rootGroup></flowController>"#;
        let doc = parse_flow_bytes(input).unwrap().unwrap();
        let group = doc.root().child("rootGroup").unwrap();
        assert_eq!(group.child_text("name"), Some("A & B"));
    }

    #[test]
    fn test_doctype_warning_continues() {
        let collector = SharedCollector::default();
        let parser = FlowParser::new().with_handler(collector.clone());
        let input = format!("<!DOCTYPE flowController>\n{}", MINIMAL.trim_start_matches(|c| c != '\n'));

        assert!(parser.parse(input.as_bytes()).unwrap().is_some());
        let issues = collector.0.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_handler_sees_aborting_issue() {
        let collector = SharedCollector::default();
        let parser = FlowParser::new().with_handler(collector.clone());

        assert!(parser.parse(b"<nope/>").is_err());
        let issues = collector.0.issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_abort());
    }

    #[test]
    fn test_into_flow_error() {
        let err: FlowError = parse_flow_bytes(b"<nope/>").unwrap_err().into();
        assert!(err.is_input_rejection());
    }
}
