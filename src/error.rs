//! Error types for the overlay engine
//!
//! Three layers, mirroring where things can go wrong: configuration errors
//! (bad globs, option sets the host compiler rejects), host instance errors
//! (opaque failures reported by the wrapped compiler), and query errors
//! (cancellation, discarded sessions, failed diagnostic calls).

use miette::Diagnostic;
use thiserror::Error;

/// Configuration errors. Each variant is attributed to a single override
/// rule, so a broken rule never takes down the other partitions or the
/// default compiler.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse overlay configuration: {message}")]
    #[diagnostic(code(stratacheck::config::parse))]
    Parse { message: String },

    #[error("invalid glob pattern `{pattern}` in override rule {rule_index}: {message}")]
    #[diagnostic(
        code(stratacheck::config::invalid_pattern),
        help("check the `files` globs declared for this rule")
    )]
    InvalidPattern {
        rule_index: usize,
        pattern: String,
        message: String,
    },

    #[error("override rule {rule_index} could not create a compiler instance: {message}")]
    #[diagnostic(
        code(stratacheck::config::instance_creation),
        help("check the rule's compilerOptions against what the host compiler accepts")
    )]
    InstanceCreation { rule_index: usize, message: String },

    #[error("invalid glob pattern `{pattern}` in ignore list: {message}")]
    #[diagnostic(
        code(stratacheck::config::invalid_ignore),
        help("check the top-level `ignores` globs")
    )]
    InvalidIgnore { pattern: String, message: String },
}

impl ConfigError {
    /// The override rule this error is attributed to, if any.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            ConfigError::Parse { .. } | ConfigError::InvalidIgnore { .. } => None,
            ConfigError::InvalidPattern { rule_index, .. }
            | ConfigError::InstanceCreation { rule_index, .. } => Some(*rule_index),
        }
    }
}

/// Opaque failure reported by the host compiler capability, e.g. when a
/// merged option set fails validation at instance-creation time.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
#[diagnostic(code(stratacheck::host::instance_failure))]
pub struct InstanceError {
    pub message: String,
}

impl InstanceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a diagnostic query that did not complete.
///
/// `Cancelled` is cooperative and advisory, surfaced as its own variant so
/// hosts can tell it apart from real failures; it is never logged as an
/// error. There are no retries anywhere: a failed host call is surfaced
/// immediately for that file or partition.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("diagnostic query was cancelled")]
    #[diagnostic(
        code(stratacheck::query::cancelled),
        help("cancellation is cooperative; re-issue the query to retry")
    )]
    Cancelled,

    #[error("overlay session has been discarded")]
    #[diagnostic(
        code(stratacheck::query::discarded),
        help("wrap the program or session again to build a fresh partition map")
    )]
    Discarded,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Host(#[from] InstanceError),
}

impl QueryError {
    /// True for the cooperative-cancellation outcome, which is distinct from
    /// both success and failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }
}

/// Unified error for the one-shot convenience entry points, combining
/// configuration and query failures.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),
}
