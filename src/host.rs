//! Host compiler capability
//!
//! The overlay treats the underlying compiler as a black box reached through
//! these traits: a factory that creates checking instances from root files
//! plus options, a batch program surface, and an incremental session surface
//! for editors. Hosts keep any shared document cache inside their factory so
//! unmodified files are not re-read once per partition.

use std::path::PathBuf;

use crate::cancel::CancellationToken;
use crate::config::CompilerOptions;
use crate::diagnostics::{Diagnostic, Span};
use crate::error::{InstanceError, QueryError};

/// Which diagnostic phase a per-file query wants. Batch consumers ask for
/// full semantic results; watch consumers ask for the earlier bind-and-check
/// pass. The mode travels with the query so routing stays identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticMode {
    Semantic,
    BindCheck,
}

/// Minimal per-file diagnostic capability shared by batch programs and
/// incremental sessions. Object-safe: the router dispatches through it.
pub trait DiagnosticSource {
    fn file_diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError>;
}

/// A one-shot compiler program, as used by build and watch tooling.
pub trait CompilerInstance: DiagnosticSource {
    /// The complete ordered root file list of this compilation.
    fn root_files(&self) -> Vec<String>;

    fn options(&self) -> &CompilerOptions;

    /// Source text of a root file, `None` when the program does not know it.
    fn source_text(&self, file: &str) -> Option<String>;

    /// Whole-project semantic diagnostics. Hosts without a native project
    /// query fold the per-file query over every root file.
    fn project_diagnostics(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        let mut diagnostics = Vec::new();
        for file in self.root_files() {
            if let Some(token) = token {
                token.check()?;
            }
            diagnostics.extend(self.file_diagnostics(&file, DiagnosticMode::Semantic, token)?);
        }
        Ok(diagnostics)
    }

    /// The host-protocol entry point: a specific file means a per-file
    /// query, no file means the whole project.
    fn semantic_diagnostics(
        &self,
        file: Option<&str>,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        match file {
            Some(file) => self.file_diagnostics(file, DiagnosticMode::Semantic, token),
            None => self.project_diagnostics(token),
        }
    }
}

/// Hover result for a position-addressed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    pub text: String,
    pub span: Span,
}

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub span: Span,
}

/// A live, file-addressable checking session as editors drive it. Position
/// queries must reflect the option set governing the queried file, which is
/// why the overlay routes them through the same file-to-instance mapping as
/// diagnostics.
pub trait LanguageSession: DiagnosticSource {
    fn root_files(&self) -> Vec<String>;

    fn options(&self) -> &CompilerOptions;

    /// Current snapshot of a file's text, `None` when unknown.
    fn source_text(&self, file: &str) -> Option<String>;

    fn quick_info(&self, file: &str, position: usize) -> Result<Option<QuickInfo>, QueryError>;

    fn definition_at(&self, file: &str, position: usize) -> Result<Option<Location>, QueryError>;

    fn completions_at(&self, file: &str, position: usize) -> Result<Vec<String>, QueryError>;
}

/// Host adapter an embedder supplies when incremental sessions are created.
pub trait ServiceHost {
    fn file_exists(&self, file: &str) -> bool;

    /// Current text snapshot of a file.
    fn snapshot(&self, file: &str) -> Option<String>;

    /// Monotonic per-file version, used by hosts to invalidate caches.
    fn version(&self, file: &str) -> Option<String>;

    fn current_directory(&self) -> PathBuf;
}

/// Creates compiler instances for partitions. Implementations capture their
/// own compiler host or document cache so instances share parsed state where
/// the underlying protocol supports it.
///
/// A creation failure is attributed to the requesting partition only; other
/// partitions and the default compiler remain usable.
pub trait InstanceFactory {
    type Instance;

    fn create_instance(
        &self,
        root_files: Vec<String>,
        options: CompilerOptions,
    ) -> Result<Self::Instance, InstanceError>;
}
