//! Scripted host compiler for routing tests
//!
//! The stubs behave deterministically so tests can tell which option set
//! checked a file: every query is recorded in a shared [`CallLog`] as
//! `file|mode|strict=<flag>`, files with `bad` in their name always report
//! one fault, and an instance whose merged options enable `strict` reports
//! one extra strict fault per queried file. A factory handed options with
//! `broken: true` refuses to create the instance.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::cancel::CancellationToken;
use crate::config::{CompilerOptions, OverlayConfig, OverrideRule};
use crate::diagnostics::{Diagnostic, Span};
use crate::error::{InstanceError, QueryError};
use crate::host::{
    CompilerInstance, DiagnosticMode, DiagnosticSource, InstanceFactory, LanguageSession,
    Location, QuickInfo, ServiceHost,
};

pub const ROOT: &str = "/proj";

/// Observation log shared by every stub instance a factory creates.
#[derive(Default)]
pub struct CallLog {
    created: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queries_for(&self, file: &str) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|entry| entry.starts_with(&format!("{file}|")))
            .collect()
    }

    fn note_created(&self) {
        self.created.fetch_add(1, Ordering::SeqCst);
    }

    fn record(&self, entry: String) {
        self.queries.lock().unwrap().push(entry);
    }
}

fn strict_flag(options: &CompilerOptions) -> bool {
    options.bool_flag("strict").unwrap_or(false)
}

/// Checking behavior shared by the stub program and the stub session.
struct Script {
    root_files: RwLock<Vec<String>>,
    options: CompilerOptions,
    log: Arc<CallLog>,
}

impl Script {
    fn new(root_files: Vec<String>, options: CompilerOptions, log: Arc<CallLog>) -> Self {
        Self {
            root_files: RwLock::new(root_files),
            options,
            log,
        }
    }

    fn roots(&self) -> Vec<String> {
        self.root_files.read().unwrap().clone()
    }

    fn set_roots(&self, roots: Vec<String>) {
        *self.root_files.write().unwrap() = roots;
    }

    fn diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        if let Some(token) = token {
            token.check()?;
        }
        let strict = strict_flag(&self.options);
        self.log.record(format!("{file}|{mode:?}|strict={strict}"));

        let mut diagnostics = Vec::new();
        if file.contains("bad") {
            diagnostics.push(Diagnostic::error(file, "unconditional fault"));
        }
        if strict {
            diagnostics.push(Diagnostic::error(file, "strict fault").with_code("strict"));
        }
        Ok(diagnostics)
    }
}

/// Stub batch program.
pub struct StubProgram {
    script: Script,
}

impl StubProgram {
    pub fn new(root_files: Vec<String>, options: CompilerOptions, log: Arc<CallLog>) -> Self {
        Self {
            script: Script::new(root_files, options, log),
        }
    }

    /// Simulate a watch-mode rebuild changing the root set.
    pub fn set_root_files(&self, roots: Vec<String>) {
        self.script.set_roots(roots);
    }
}

impl DiagnosticSource for StubProgram {
    fn file_diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        self.script.diagnostics(file, mode, token)
    }
}

impl CompilerInstance for StubProgram {
    fn root_files(&self) -> Vec<String> {
        self.script.roots()
    }

    fn options(&self) -> &CompilerOptions {
        &self.script.options
    }

    fn source_text(&self, file: &str) -> Option<String> {
        self.script
            .roots()
            .iter()
            .any(|root| root == file)
            .then(|| format!("// contents of {file}"))
    }
}

/// Factory producing [`StubProgram`]s.
pub struct StubFactory {
    log: Arc<CallLog>,
}

impl StubFactory {
    pub fn new() -> (Self, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl InstanceFactory for StubFactory {
    type Instance = StubProgram;

    fn create_instance(
        &self,
        root_files: Vec<String>,
        options: CompilerOptions,
    ) -> Result<StubProgram, InstanceError> {
        if options.bool_flag("broken") == Some(true) {
            return Err(InstanceError::new("option `broken` rejected by host"));
        }
        self.log.note_created();
        Ok(StubProgram::new(root_files, options, Arc::clone(&self.log)))
    }
}

/// In-memory service host adapter.
pub struct StubServiceHost {
    cwd: PathBuf,
    files: Mutex<HashMap<String, (String, usize)>>,
}

impl StubServiceHost {
    pub fn new(cwd: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            cwd: cwd.into(),
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Add or replace a file, bumping its version.
    pub fn upsert(&self, file: &str, content: &str) {
        let mut files = self.files.lock().unwrap();
        let version = files.get(file).map(|(_, v)| v + 1).unwrap_or(1);
        files.insert(file.to_string(), (content.to_string(), version));
    }
}

impl ServiceHost for StubServiceHost {
    fn file_exists(&self, file: &str) -> bool {
        self.files.lock().unwrap().contains_key(file)
    }

    fn snapshot(&self, file: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(file)
            .map(|(content, _)| content.clone())
    }

    fn version(&self, file: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(file)
            .map(|(_, version)| version.to_string())
    }

    fn current_directory(&self) -> PathBuf {
        self.cwd.clone()
    }
}

/// Stub incremental session backed by a [`StubServiceHost`].
pub struct StubSession {
    script: Script,
    host: Arc<StubServiceHost>,
}

impl StubSession {
    pub fn new(
        root_files: Vec<String>,
        options: CompilerOptions,
        log: Arc<CallLog>,
        host: Arc<StubServiceHost>,
    ) -> Self {
        Self {
            script: Script::new(root_files, options, log),
            host,
        }
    }

    /// Simulate the editor adding or removing root files.
    pub fn set_root_files(&self, roots: Vec<String>) {
        self.script.set_roots(roots);
    }
}

impl DiagnosticSource for StubSession {
    fn file_diagnostics(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        self.script.diagnostics(file, mode, token)
    }
}

impl LanguageSession for StubSession {
    fn root_files(&self) -> Vec<String> {
        self.script.roots()
    }

    fn options(&self) -> &CompilerOptions {
        &self.script.options
    }

    fn source_text(&self, file: &str) -> Option<String> {
        self.host.snapshot(file)
    }

    fn quick_info(&self, file: &str, position: usize) -> Result<Option<QuickInfo>, QueryError> {
        Ok(Some(QuickInfo {
            text: format!("{file}: strict={}", strict_flag(&self.script.options)),
            span: Span::new(position, position + 1),
        }))
    }

    fn definition_at(&self, file: &str, position: usize) -> Result<Option<Location>, QueryError> {
        Ok(Some(Location {
            file: file.to_string(),
            span: Span::new(position, position),
        }))
    }

    fn completions_at(&self, file: &str, _position: usize) -> Result<Vec<String>, QueryError> {
        Ok(vec![format!(
            "completion: strict={}",
            strict_flag(&self.script.options)
        )])
    }
}

/// Factory producing [`StubSession`]s from a shared service host.
pub struct StubSessionFactory {
    log: Arc<CallLog>,
    host: Arc<StubServiceHost>,
}

impl StubSessionFactory {
    pub fn new(host: Arc<StubServiceHost>) -> (Self, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        (
            Self {
                log: Arc::clone(&log),
                host,
            },
            log,
        )
    }
}

impl InstanceFactory for StubSessionFactory {
    type Instance = StubSession;

    fn create_instance(
        &self,
        root_files: Vec<String>,
        options: CompilerOptions,
    ) -> Result<StubSession, InstanceError> {
        if options.bool_flag("broken") == Some(true) {
            return Err(InstanceError::new("option `broken` rejected by host"));
        }
        for file in &root_files {
            if !self.host.file_exists(file) {
                return Err(InstanceError::new(format!("missing root file {file}")));
            }
        }
        self.log.note_created();
        Ok(StubSession::new(
            root_files,
            options,
            Arc::clone(&self.log),
            Arc::clone(&self.host),
        ))
    }
}

/// Absolute paths under the test project root.
pub fn abs(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| format!("{ROOT}/{name}")).collect()
}

pub fn rule(globs: &[&str], options: CompilerOptions) -> OverrideRule {
    OverrideRule::new(globs.iter().map(|g| g.to_string()).collect(), options)
}

pub fn strict(on: bool) -> CompilerOptions {
    CompilerOptions::new().with("strict", on)
}

pub fn overlay_config(overrides: Vec<OverrideRule>, ignores: &[&str]) -> OverlayConfig {
    OverlayConfig {
        overrides,
        ignores: ignores.iter().map(|g| g.to_string()).collect(),
    }
}
