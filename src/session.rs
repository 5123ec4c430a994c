//! Interception layer
//!
//! Wraps an existing compiler session so diagnostic retrieval goes through
//! the partition router while every other capability passes through to the
//! wrapped object untouched. Two decorators cover the two host protocols:
//! [`OverlayProgram`] for one-shot build/watch programs and
//! [`OverlayService`] for live editor sessions.
//!
//! All partition state lives in a per-session [`SessionContext`] owned by
//! the decorator; there is no cross-call shared state. Rebuilding the
//! partition map is purely a function of the current rule set and root file
//! set, so a stale map is simply thrown away and rebuilt.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::cancel::CancellationToken;
use crate::config::{CompilerOptions, OverlayConfig};
use crate::diagnostics::Diagnostic;
use crate::error::{ConfigError, QueryError};
use crate::host::{
    CompilerInstance, DiagnosticMode, DiagnosticSource, InstanceFactory, LanguageSession,
    Location, QuickInfo,
};
use crate::matcher::{PatternSet, PatternError};
use crate::partition::{compile_rules, partition, CompiledRule, FileAssignment, PartitionMap};
use crate::pool::SubCompilerPool;
use crate::router::DiagnosticRouter;

/// Lifecycle of an overlay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No partition map has been built yet.
    Uninitialized,
    /// The partition map exists but no query has been served from it.
    Partitioned,
    /// Serving queries.
    Active,
    /// Torn down; all owned compiler instances have been released.
    Discarded,
}

/// The partition map and pool for one root-set snapshot.
struct PartitionState<F: InstanceFactory> {
    map: Arc<PartitionMap>,
    pool: Arc<SubCompilerPool<F>>,
    fingerprint: u64,
}

impl<F: InstanceFactory> Clone for PartitionState<F> {
    fn clone(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            pool: Arc::clone(&self.pool),
            fingerprint: self.fingerprint,
        }
    }
}

enum SessionState<F: InstanceFactory> {
    Uninitialized,
    Ready { state: PartitionState<F>, served: bool },
    Discarded,
}

/// Per-session owner of the partition map and sub-compiler pool.
///
/// The partition state is fingerprinted against the wrapped session's root
/// file list and default options; when either drifts (a watch-mode rebuild,
/// an editor adding files) the next query rebuilds from scratch and the old
/// instances are dropped.
pub struct SessionContext<F: InstanceFactory> {
    factory: Arc<F>,
    rules: Vec<CompiledRule>,
    ignores: Option<PatternSet>,
    root_path: PathBuf,
    state: RwLock<SessionState<F>>,
}

impl<F: InstanceFactory> SessionContext<F> {
    pub fn new(
        factory: F,
        config: &OverlayConfig,
        root_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let ignores = if config.ignores.is_empty() {
            None
        } else {
            Some(PatternSet::compile(&config.ignores).map_err(
                |PatternError { pattern, message }| ConfigError::InvalidIgnore {
                    pattern,
                    message,
                },
            )?)
        };

        Ok(Self {
            factory: Arc::new(factory),
            rules: compile_rules(&config.overrides),
            ignores,
            root_path: root_path.into(),
            state: RwLock::new(SessionState::Uninitialized),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn ignores(&self) -> Option<&PatternSet> {
        self.ignores.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        match &*self.state.read().unwrap() {
            SessionState::Uninitialized => SessionPhase::Uninitialized,
            SessionState::Ready { served: false, .. } => SessionPhase::Partitioned,
            SessionState::Ready { served: true, .. } => SessionPhase::Active,
            SessionState::Discarded => SessionPhase::Discarded,
        }
    }

    /// Tear the session down, releasing all owned compiler instances.
    /// Further queries report [`QueryError::Discarded`].
    pub fn discard(&self) {
        let mut state = self.state.write().unwrap();
        if !matches!(*state, SessionState::Discarded) {
            log::debug!("overlay session discarded");
            *state = SessionState::Discarded;
        }
    }

    fn fingerprint(roots: &[String], defaults: &CompilerOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        roots.len().hash(&mut hasher);
        for file in roots {
            file.hash(&mut hasher);
        }
        if let Ok(options) = serde_json::to_string(defaults) {
            options.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Fetch the current partition state, building or rebuilding it when the
    /// wrapped session's root set or default options have drifted. Rebuilds
    /// are idempotent, so a concurrent host that races two queries at worst
    /// builds the same state twice.
    fn ensure_ready(
        &self,
        roots: &[String],
        defaults: &CompilerOptions,
    ) -> Result<PartitionState<F>, QueryError> {
        let fingerprint = Self::fingerprint(roots, defaults);

        {
            let state = self.state.read().unwrap();
            match &*state {
                SessionState::Discarded => return Err(QueryError::Discarded),
                SessionState::Ready { state, .. } if state.fingerprint == fingerprint => {
                    return Ok(state.clone())
                }
                _ => {}
            }
        }

        let mut state = self.state.write().unwrap();
        match &*state {
            SessionState::Discarded => return Err(QueryError::Discarded),
            SessionState::Ready { state, .. } if state.fingerprint == fingerprint => {
                return Ok(state.clone())
            }
            SessionState::Ready { .. } => {
                log::debug!("root set or options changed, rebuilding partition map");
            }
            SessionState::Uninitialized => {}
        }

        let map = Arc::new(partition(roots, &self.rules, &self.root_path));
        let pool = Arc::new(SubCompilerPool::new(
            Arc::clone(&self.factory),
            defaults,
            &self.rules,
        ));
        let built = PartitionState {
            map,
            pool,
            fingerprint,
        };
        *state = SessionState::Ready {
            state: built.clone(),
            served: false,
        };

        Ok(built)
    }

    fn mark_served(&self) {
        let mut state = self.state.write().unwrap();
        if let SessionState::Ready { served, .. } = &mut *state {
            *served = true;
        }
    }
}

/// Decorator over a batch compiler program.
///
/// Forwards every capability to the wrapped program and overrides exactly
/// diagnostic retrieval: per-file queries resolve through the partition map,
/// and the no-file semantic query becomes a whole-project routed query.
pub struct OverlayProgram<P, F: InstanceFactory> {
    inner: P,
    context: SessionContext<F>,
}

impl<P, F> OverlayProgram<P, F>
where
    P: CompilerInstance,
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    pub fn wrap(
        inner: P,
        factory: F,
        config: &OverlayConfig,
        root_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            context: SessionContext::new(factory, config, root_path)?,
            inner,
        })
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Unwrap, discarding all owned compiler instances.
    pub fn into_inner(self) -> P {
        self.context.discard();
        self.inner
    }

    pub fn phase(&self) -> SessionPhase {
        self.context.phase()
    }

    pub fn discard(&self) {
        self.context.discard();
    }

    fn route_file(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        let roots = self.inner.root_files();
        let state = self.context.ensure_ready(&roots, self.inner.options())?;
        let router = DiagnosticRouter::new(
            state.map.as_ref(),
            state.pool.as_ref(),
            &self.inner,
            self.context.ignores(),
            self.context.root_path(),
        );
        let result = router.diagnostics_for_file(file, mode, token)?;
        self.context.mark_served();
        Ok(result)
    }

    fn route_project(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        let roots = self.inner.root_files();
        let state = self.context.ensure_ready(&roots, self.inner.options())?;
        let router = DiagnosticRouter::new(
            state.map.as_ref(),
            state.pool.as_ref(),
            &self.inner,
            self.context.ignores(),
            self.context.root_path(),
        );
        let result = router.diagnostics_for_project(token)?;
        self.context.mark_served();
        Ok(result)
    }
}

impl<P, F> DiagnosticSource for OverlayProgram<P, F>
where
    P: CompilerInstance,
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    fn file_diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        self.route_file(file, mode, token)
    }
}

impl<P, F> CompilerInstance for OverlayProgram<P, F>
where
    P: CompilerInstance,
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    fn root_files(&self) -> Vec<String> {
        self.inner.root_files()
    }

    fn options(&self) -> &CompilerOptions {
        self.inner.options()
    }

    fn source_text(&self, file: &str) -> Option<String> {
        self.inner.source_text(file)
    }

    fn project_diagnostics(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        self.route_project(token)
    }
}

/// Decorator over a live language session.
///
/// Diagnostics and position-addressed queries resolve through the
/// file-to-instance mapping, so hovering a symbol in an overridden file
/// reflects that file's override options. Everything else forwards to the
/// wrapped session.
pub struct OverlayService<S, F: InstanceFactory> {
    inner: S,
    context: SessionContext<F>,
}

impl<S, F> OverlayService<S, F>
where
    S: LanguageSession,
    F: InstanceFactory,
    F::Instance: LanguageSession,
{
    pub fn wrap(
        inner: S,
        factory: F,
        config: &OverlayConfig,
        root_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            context: SessionContext::new(factory, config, root_path)?,
            inner,
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.context.discard();
        self.inner
    }

    pub fn phase(&self) -> SessionPhase {
        self.context.phase()
    }

    pub fn discard(&self) {
        self.context.discard();
    }

    fn route_file(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        let roots = self.inner.root_files();
        let state = self.context.ensure_ready(&roots, self.inner.options())?;
        let router = DiagnosticRouter::new(
            state.map.as_ref(),
            state.pool.as_ref(),
            &self.inner,
            self.context.ignores(),
            self.context.root_path(),
        );
        let result = router.diagnostics_for_file(file, mode, token)?;
        self.context.mark_served();
        Ok(result)
    }

    /// The partition instance answering position queries for `file`, or
    /// `None` when the wrapped session should answer: residual, unknown and
    /// ignored files, and files whose rule failed to create an instance
    /// (default-options answers beat no answers).
    fn overriding_instance(&self, file: &str) -> Result<Option<Arc<F::Instance>>, QueryError> {
        let roots = self.inner.root_files();
        let state = self.context.ensure_ready(&roots, self.inner.options())?;

        if let Some(patterns) = self.context.ignores() {
            if patterns.matches_in(self.context.root_path(), file) {
                return Ok(None);
            }
        }

        match state.map.assignment(file) {
            Some(FileAssignment::Partition(index)) => {
                match state.pool.get_or_create(state.map.as_ref(), index) {
                    Ok(instance) => {
                        self.context.mark_served();
                        Ok(Some(instance))
                    }
                    Err(_) => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

impl<S, F> DiagnosticSource for OverlayService<S, F>
where
    S: LanguageSession,
    F: InstanceFactory,
    F::Instance: LanguageSession,
{
    fn file_diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        self.route_file(file, mode, token)
    }
}

impl<S, F> LanguageSession for OverlayService<S, F>
where
    S: LanguageSession,
    F: InstanceFactory,
    F::Instance: LanguageSession,
{
    fn root_files(&self) -> Vec<String> {
        self.inner.root_files()
    }

    fn options(&self) -> &CompilerOptions {
        self.inner.options()
    }

    fn source_text(&self, file: &str) -> Option<String> {
        self.inner.source_text(file)
    }

    fn quick_info(&self, file: &str, position: usize) -> Result<Option<QuickInfo>, QueryError> {
        match self.overriding_instance(file)? {
            Some(instance) => instance.quick_info(file, position),
            None => self.inner.quick_info(file, position),
        }
    }

    fn definition_at(&self, file: &str, position: usize) -> Result<Option<Location>, QueryError> {
        match self.overriding_instance(file)? {
            Some(instance) => instance.definition_at(file, position),
            None => self.inner.definition_at(file, position),
        }
    }

    fn completions_at(&self, file: &str, position: usize) -> Result<Vec<String>, QueryError> {
        match self.overriding_instance(file)? {
            Some(instance) => instance.completions_at(file, position),
            None => self.inner.completions_at(file, position),
        }
    }
}
