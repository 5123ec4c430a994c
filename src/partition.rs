//! Partitioning of the root file set across override rules
//!
//! Declaration order expresses override priority, most-specific-last: rules
//! are claimed in reverse declaration order so the last-declared rule claims
//! files first. The result is a set of pairwise-disjoint partitions plus the
//! residual set checked under unmodified default options, backed by a single
//! file-to-assignment index built in one pass.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{CompilerOptions, OverrideRule};
use crate::error::ConfigError;
use crate::matcher::{relative_to_root, PatternSet};

/// Declaration files are visible to every compiler instance and never
/// exclusively owned by a partition.
pub const DECLARATION_SUFFIX: &str = ".d.ts";

pub fn is_declaration_file(file: &str) -> bool {
    file.ends_with(DECLARATION_SUFFIX)
}

/// An override rule with its glob list compiled, ready for claiming.
///
/// A rule whose patterns fail to compile claims nothing; the error is kept
/// so it resurfaces when the rule's compiler instance would be created,
/// leaving every other partition usable.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub index: usize,
    pub options: CompilerOptions,
    matcher: Result<PatternSet, ConfigError>,
}

impl CompiledRule {
    pub fn compile(index: usize, rule: &OverrideRule) -> Self {
        let matcher = PatternSet::compile(&rule.files).map_err(|error| {
            ConfigError::InvalidPattern {
                rule_index: index,
                pattern: error.pattern,
                message: error.message,
            }
        });

        Self {
            index,
            options: rule.compiler_options.clone(),
            matcher,
        }
    }

    /// The configuration error that broke this rule, if any.
    pub fn config_error(&self) -> Option<&ConfigError> {
        self.matcher.as_ref().err()
    }

    fn matches(&self, relative_path: &str) -> bool {
        match &self.matcher {
            Ok(set) => set.is_match(relative_path),
            Err(_) => false,
        }
    }
}

/// Compile every rule in declaration order.
pub fn compile_rules(rules: &[OverrideRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| CompiledRule::compile(index, rule))
        .collect()
}

/// One rule's slice of the root file set. Exists even when empty, so
/// whole-project queries enumerate every rule consistently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub rule_index: usize,
    /// Matched files in root-set order.
    pub files: Vec<String>,
}

/// Where a file's diagnostics come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAssignment {
    /// Checked by the partition with this rule index.
    Partition(usize),
    /// Checked by the default compiler with unmodified options.
    Residual,
}

/// Disjoint partitions plus residual for a complete root file set, with a
/// file-to-assignment index for O(1) routing.
#[derive(Debug, Clone)]
pub struct PartitionMap {
    partitions: Vec<Partition>,
    residual: Vec<String>,
    declaration_files: Vec<String>,
    index: HashMap<String, FileAssignment>,
}

impl PartitionMap {
    /// Partitions in declaration order, one per rule, empty ones included.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Files governed by unmodified default options, in root-set order.
    /// Declaration files are residual-owned.
    pub fn residual(&self) -> &[String] {
        &self.residual
    }

    /// Declaration files, appended to every compiler instance's root set.
    pub fn declaration_files(&self) -> &[String] {
        &self.declaration_files
    }

    pub fn assignment(&self, file: &str) -> Option<FileAssignment> {
        self.index.get(file).copied()
    }

    /// Rule index owning `file`, `None` for residual or unknown files.
    pub fn partition_for(&self, file: &str) -> Option<usize> {
        match self.assignment(file) {
            Some(FileAssignment::Partition(index)) => Some(index),
            _ => None,
        }
    }

    /// Total number of files across partitions and residual.
    pub fn file_count(&self) -> usize {
        self.index.len()
    }
}

/// Assign every root file to at most one rule.
///
/// Rules are evaluated in reverse declaration order; each claims, among
/// files not yet claimed, those whose root-relative path matches. Duplicate
/// rules are not deduplicated; an earlier-declared duplicate simply claims
/// nothing because the later one has exhausted the pool.
pub fn partition(files: &[String], rules: &[CompiledRule], root_path: &Path) -> PartitionMap {
    let mut index: HashMap<String, FileAssignment> = HashMap::with_capacity(files.len());
    let mut declaration_files = Vec::new();

    for file in files {
        if is_declaration_file(file) {
            declaration_files.push(file.clone());
            index.insert(file.clone(), FileAssignment::Residual);
        }
    }

    for rule in rules.iter().rev() {
        for file in files {
            if index.contains_key(file) {
                continue;
            }
            if rule.matches(&relative_to_root(root_path, file)) {
                index.insert(file.clone(), FileAssignment::Partition(rule.index));
            }
        }
    }

    let mut partitions: Vec<Partition> = rules
        .iter()
        .map(|rule| Partition {
            rule_index: rule.index,
            files: Vec::new(),
        })
        .collect();
    let mut residual = Vec::new();

    for file in files {
        match index.get(file).copied() {
            Some(FileAssignment::Partition(rule_index)) => {
                partitions[rule_index].files.push(file.clone());
            }
            _ => {
                residual.push(file.clone());
                index.insert(file.clone(), FileAssignment::Residual);
            }
        }
    }

    log::debug!(
        "partitioned {} root files into {} override groups, {} residual, {} declaration",
        files.len(),
        partitions.len(),
        residual.len(),
        declaration_files.len()
    );

    PartitionMap {
        partitions,
        residual,
        declaration_files,
        index,
    }
}
