//! Diagnostic routing
//!
//! Decides which compiler instance answers a query. Per-file queries look up
//! the file's assignment and delegate to its partition's instance, or to the
//! default compiler for residual and unknown files; losing diagnostics
//! entirely is worse than mis-attributing options, so a lookup miss is never
//! a hard failure. Whole-project queries fold the per-file query over every
//! partition and the residual set, covering every root file exactly once.

use std::path::Path;

use crate::cancel::{check_opt, CancellationToken};
use crate::diagnostics::Diagnostic;
use crate::error::QueryError;
use crate::host::{DiagnosticMode, DiagnosticSource, InstanceFactory};
use crate::matcher::PatternSet;
use crate::partition::{FileAssignment, PartitionMap};
use crate::pool::SubCompilerPool;

/// Borrowed view over one session's partition state, valid for one query.
pub struct DiagnosticRouter<'a, F>
where
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    map: &'a PartitionMap,
    pool: &'a SubCompilerPool<F>,
    default_source: &'a dyn DiagnosticSource,
    ignores: Option<&'a PatternSet>,
    root_path: &'a Path,
}

impl<'a, F> DiagnosticRouter<'a, F>
where
    F: InstanceFactory,
    F::Instance: DiagnosticSource,
{
    pub fn new(
        map: &'a PartitionMap,
        pool: &'a SubCompilerPool<F>,
        default_source: &'a dyn DiagnosticSource,
        ignores: Option<&'a PatternSet>,
        root_path: &'a Path,
    ) -> Self {
        Self {
            map,
            pool,
            default_source,
            ignores,
            root_path,
        }
    }

    /// Ignored files never reach any compiler instance.
    fn is_ignored(&self, file: &str) -> bool {
        self.ignores
            .is_some_and(|patterns| patterns.matches_in(self.root_path, file))
    }

    /// Diagnostics for a single file, under the option set its assignment
    /// selects.
    pub fn diagnostics_for_file(
        &self,
        file: &str,
        mode: DiagnosticMode,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        if self.is_ignored(file) {
            return Ok(Vec::new());
        }
        check_opt(token)?;

        match self.map.assignment(file) {
            Some(FileAssignment::Partition(index)) => {
                match self.pool.get_or_create(self.map, index) {
                    Ok(instance) => instance.file_diagnostics(file, mode, token),
                    Err(error) => Ok(vec![Diagnostic::configuration(
                        Some(file.to_string()),
                        &error,
                    )]),
                }
            }
            _ => self.default_source.file_diagnostics(file, mode, token),
        }
    }

    /// Semantic diagnostics for the whole project: every partition in
    /// declaration order, empty ones included, then the residual set. Every
    /// root file appears exactly once.
    ///
    /// Cancellation is polled at each partition boundary and between files;
    /// a cancelled query stops promptly without rolling back processed
    /// files.
    pub fn diagnostics_for_project(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, QueryError> {
        check_opt(token)?;
        let mut diagnostics = Vec::new();

        for partition in self.map.partitions() {
            check_opt(token)?;

            match self.pool.get_or_create(self.map, partition.rule_index) {
                Ok(instance) => {
                    for file in &partition.files {
                        check_opt(token)?;
                        if self.is_ignored(file) {
                            continue;
                        }
                        diagnostics.extend(instance.file_diagnostics(
                            file,
                            DiagnosticMode::Semantic,
                            token,
                        )?);
                    }
                }
                Err(error) => {
                    // The rule is unusable; report it per claimed file, or
                    // once file-less so an empty partition's failure is not
                    // silently invisible.
                    if partition.files.is_empty() {
                        diagnostics.push(Diagnostic::configuration(None, &error));
                    } else {
                        for file in &partition.files {
                            if self.is_ignored(file) {
                                continue;
                            }
                            diagnostics
                                .push(Diagnostic::configuration(Some(file.clone()), &error));
                        }
                    }
                }
            }
        }

        for file in self.map.residual() {
            check_opt(token)?;
            if self.is_ignored(file) {
                continue;
            }
            diagnostics.extend(self.default_source.file_diagnostics(
                file,
                DiagnosticMode::Semantic,
                token,
            )?);
        }

        Ok(diagnostics)
    }
}
