//! Per-glob compiler-option overlays for a host typechecker
//!
//! One logical compilation, different strictness per file subset: a project
//! declares an ordered list of override rules (glob patterns plus a partial
//! compiler-option set), and files matching a rule are checked as if
//! compiled with that rule's options merged over the project defaults.
//! Later-declared rules win when a file matches several.
//!
//! ## Architecture
//!
//! - **Matcher**: compiles a rule's globs into a predicate over
//!   root-relative paths.
//! - **Partitioner**: assigns every root file to at most one rule,
//!   producing disjoint partitions plus the residual set checked under
//!   unmodified defaults.
//! - **Sub-compiler pool**: one lazily-created host compiler instance per
//!   partition, with per-partition failure isolation.
//! - **Diagnostic router**: answers per-file and whole-project queries by
//!   delegating to the owning partition's instance or the default compiler,
//!   covering every root file exactly once.
//! - **Interception layer**: [`OverlayProgram`] and [`OverlayService`]
//!   decorate an existing program or live session, rerouting diagnostic and
//!   position queries while forwarding everything else untouched.
//!
//! ## Integration
//!
//! The host compiler stays a black box behind the traits in [`host`]; the
//! overlay only decides which instance answers which query, never what a
//! diagnostic looks like.

pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod matcher;
pub mod partition;
pub mod pool;
pub mod router;
pub mod session;

use std::path::PathBuf;

// Re-export public API
pub use cancel::CancellationToken;
pub use config::{CompilerOptions, OverlayConfig, OverrideRule};
pub use diagnostics::{Category, Diagnostic, Severity, Span};
pub use error::{ConfigError, InstanceError, OverlayError, QueryError};
pub use host::{
    CompilerInstance, DiagnosticMode, DiagnosticSource, InstanceFactory, LanguageSession,
    Location, QuickInfo, ServiceHost,
};
pub use matcher::PatternSet;
pub use partition::{
    compile_rules, is_declaration_file, partition, CompiledRule, FileAssignment, Partition,
    PartitionMap,
};
pub use pool::SubCompilerPool;
pub use router::DiagnosticRouter;
pub use session::{OverlayProgram, OverlayService, SessionContext, SessionPhase};

/// One-shot whole-project check: wrap `program` with the overlay and run the
/// routed whole-project semantic query.
pub fn check_project<P, F>(
    program: P,
    factory: F,
    config: &OverlayConfig,
    root_path: impl Into<PathBuf>,
    token: Option<&CancellationToken>,
) -> Result<Vec<Diagnostic>, OverlayError>
where
    P: CompilerInstance,
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    let overlay = OverlayProgram::wrap(program, factory, config, root_path)?;
    Ok(overlay.project_diagnostics(token)?)
}

/// One-shot per-file check under the option set the file's assignment
/// selects.
pub fn check_file<P, F>(
    program: P,
    factory: F,
    config: &OverlayConfig,
    root_path: impl Into<PathBuf>,
    file: &str,
    mode: DiagnosticMode,
    token: Option<&CancellationToken>,
) -> Result<Vec<Diagnostic>, OverlayError>
where
    P: CompilerInstance,
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    let overlay = OverlayProgram::wrap(program, factory, config, root_path)?;
    Ok(overlay.file_diagnostics(file, mode, token)?)
}

#[cfg(test)]
mod tests;
