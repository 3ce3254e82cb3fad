//! Parse issue reporting.

use std::fmt;
use std::sync::Mutex;
use tracing::{error, warn};

/// How serious a parse issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Reported, parsing continues
    Warning,
    /// Schema violation, parsing aborts
    Error,
    /// Well-formedness violation, parsing aborts
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
            Self::Fatal => write!(f, "Fatal error"),
        }
    }
}

/// A problem found while parsing or validating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    /// Severity
    pub severity: Severity,
    /// Human readable description
    pub message: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl ParseIssue {
    /// Create an issue located at a byte offset of `input`
    #[must_use]
    pub fn at(severity: Severity, message: impl Into<String>, input: &[u8], offset: usize) -> Self {
        let (line, column) = locate(input, offset);
        Self {
            severity,
            message: message.into(),
            line,
            column,
        }
    }

    /// Whether this issue aborts the parse
    #[must_use]
    pub fn is_abort(&self) -> bool {
        self.severity != Severity::Warning
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}: {}",
            self.severity, self.line, self.column, self.message
        )
    }
}

/// Translate a byte offset into a 1-based line and column
fn locate(input: &[u8], offset: usize) -> (usize, usize) {
    let prefix = &input[..offset.min(input.len())];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(newline) => prefix.len() - newline,
        None => prefix.len() + 1,
    };
    (line, column)
}

/// Receives every issue the parser encounters.
///
/// Errors and fatal errors abort the parse regardless of what the handler
/// does with them; the handler only decides how they are reported.
pub trait ErrorHandler: Send + Sync {
    /// Recoverable issue
    fn warning(&self, issue: &ParseIssue);

    /// Schema violation
    fn error(&self, issue: &ParseIssue);

    /// Well-formedness violation
    fn fatal_error(&self, issue: &ParseIssue);
}

/// Handler that logs every issue with the name of the document being parsed
#[derive(Debug, Clone)]
pub struct LoggingErrorHandler {
    context: String,
}

impl LoggingErrorHandler {
    /// Create a handler for the named document kind
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// Document kind this handler reports for
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl Default for LoggingErrorHandler {
    fn default() -> Self {
        Self::new("Flow Configuration")
    }
}

impl ErrorHandler for LoggingErrorHandler {
    fn warning(&self, issue: &ParseIssue) {
        warn!(
            line = issue.line,
            column = issue.column,
            "Schema validation warning parsing {}: {}",
            self.context,
            issue.message
        );
    }

    fn error(&self, issue: &ParseIssue) {
        error!(
            line = issue.line,
            column = issue.column,
            "Schema validation error parsing {}: {}",
            self.context,
            issue.message
        );
    }

    fn fatal_error(&self, issue: &ParseIssue) {
        error!(
            line = issue.line,
            column = issue.column,
            "Fatal error parsing {}: {}",
            self.context,
            issue.message
        );
    }
}

/// Handler that records issues in memory
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    issues: Mutex<Vec<ParseIssue>>,
}

impl CollectingErrorHandler {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues recorded so far
    #[must_use]
    pub fn issues(&self) -> Vec<ParseIssue> {
        self.issues
            .lock()
            .map(|issues| issues.clone())
            .unwrap_or_default()
    }

    fn record(&self, issue: &ParseIssue) {
        if let Ok(mut issues) = self.issues.lock() {
            issues.push(issue.clone());
        }
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn warning(&self, issue: &ParseIssue) {
        self.record(issue);
    }

    fn error(&self, issue: &ParseIssue) {
        self.record(issue);
    }

    fn fatal_error(&self, issue: &ParseIssue) {
        self.record(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let input = b"<a>\n  <b/>\n</a>";
        assert_eq!(locate(input, 0), (1, 1));
        assert_eq!(locate(input, 6), (2, 3));
        assert_eq!(locate(input, 1000), (3, 5));
    }

    #[test]
    fn test_issue_display() {
        let issue = ParseIssue::at(Severity::Error, "bad element", b"<a>\n<b/>", 4);
        assert_eq!(issue.to_string(), "Error at line 2, column 1: bad element");
        assert!(issue.is_abort());
    }

    #[test]
    fn test_collecting_handler() {
        let handler = CollectingErrorHandler::new();
        let issue = ParseIssue::at(Severity::Warning, "odd", b"", 0);
        handler.warning(&issue);
        handler.fatal_error(&issue);
        assert_eq!(handler.issues().len(), 2);
        assert!(!handler.issues()[0].is_abort());
    }

    #[test]
    fn test_logging_handler_context() {
        assert_eq!(LoggingErrorHandler::default().context(), "Flow Configuration");
    }
}
