//! Diagnostic records routed between compiler instances and host protocols
//!
//! The overlay never alters diagnostic shape, only which compiler instance
//! produced a record and which subset of files it covers. Everything here is
//! the structured record itself plus its severity and category vocabulary.

use std::fmt;

use miette::SourceSpan;

use crate::error::ConfigError;

/// Byte range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

/// Severity level for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational message (lowest priority)
    Info,
    /// Warning message
    Warning,
    /// Error message
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Which part of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Produced while parsing or binding
    Syntax,
    /// Produced by type checking
    Semantic,
    /// Produced by the overlay itself when an override rule is unusable
    Configuration,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Syntax => write!(f, "syntax"),
            Category::Semantic => write!(f, "semantic"),
            Category::Configuration => write!(f, "configuration"),
        }
    }
}

/// One structured diagnostic record: file reference, position range,
/// severity, message, category, and an optional host-specific code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// File the record refers to. `None` for project-level records that have
    /// no single file, such as a configuration failure on an empty partition.
    pub file: Option<String>,
    pub span: Option<Span>,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub code: Option<String>,
}

impl Diagnostic {
    /// Semantic error attributed to a file.
    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            span: None,
            severity: Severity::Error,
            category: Category::Semantic,
            message: message.into(),
            code: None,
        }
    }

    /// Warning attributed to a file.
    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(file, message)
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Configuration-category record carrying an override rule's failure.
    /// Reported instead of crashing the diagnostic pass when a partition's
    /// compiler instance could not be created.
    pub(crate) fn configuration(file: Option<String>, error: &ConfigError) -> Self {
        Self {
            file,
            span: None,
            severity: Severity::Error,
            category: Category::Configuration,
            message: error.to_string(),
            code: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}: {} [{}]: {}", self.severity, self.category, self.message),
            None => write!(f, "{} [{}]: {}", self.severity, self.category, self.message),
        }
    }
}
