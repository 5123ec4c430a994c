//! Glob matching over root-relative paths
//!
//! Rules are root-relative regardless of where files actually live, so every
//! path is normalized against the compilation root before matching. An empty
//! pattern set matches nothing.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// A single pattern failed to compile. Carries the offending pattern so the
/// caller can attribute the failure to its rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid glob pattern `{pattern}`: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Compiled set of glob patterns, matched as one unit.
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: GlobSet,
    patterns: Vec<String>,
}

impl PatternSet {
    /// Compile a pattern list. Patterns are compiled individually so a
    /// failure names the pattern that caused it.
    pub fn compile(patterns: &[String]) -> Result<Self, PatternError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|error| PatternError {
                pattern: pattern.clone(),
                message: error.kind().to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|error| PatternError {
            pattern: patterns.join(", "),
            message: error.kind().to_string(),
        })?;

        Ok(Self {
            set,
            patterns: patterns.to_vec(),
        })
    }

    /// Match an already-normalized root-relative path.
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }

    /// Normalize `file` against `root`, then match.
    pub fn matches_in(&self, root: &Path, file: &str) -> bool {
        self.is_match(&relative_to_root(root, file))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Normalize a file identifier relative to the compilation root, with
/// forward-slash separators. Paths outside the root (or already relative)
/// are kept as-is apart from separator normalization.
pub fn relative_to_root(root: &Path, file: &str) -> String {
    let path = Path::new(file);
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(globs: &[&str]) -> Vec<String> {
        globs.iter().map(|g| g.to_string()).collect()
    }

    #[test]
    fn matches_root_relative_paths() {
        let set = PatternSet::compile(&patterns(&["src/legacy/**"])).unwrap();

        assert!(set.matches_in(Path::new("/proj"), "/proj/src/legacy/getDate.ts"));
        assert!(!set.matches_in(Path::new("/proj"), "/proj/src/modern/getDate.ts"));
    }

    #[test]
    fn empty_pattern_set_matches_nothing() {
        let set = PatternSet::compile(&[]).unwrap();

        assert!(set.is_empty());
        assert!(!set.is_match("src/anything.ts"));
        assert!(!set.is_match(""));
    }

    #[test]
    fn globstar_spans_directories_but_star_does_not() {
        let set = PatternSet::compile(&patterns(&["**/*.ts"])).unwrap();
        assert!(set.is_match("deeply/nested/file.ts"));

        let shallow = PatternSet::compile(&patterns(&["modern/*.ts"])).unwrap();
        assert!(shallow.is_match("modern/app.ts"));
        assert!(!shallow.is_match("src/modern/app.ts"));
    }

    #[test]
    fn invalid_pattern_is_attributed() {
        let error = PatternSet::compile(&patterns(&["src/["])).unwrap_err();
        assert_eq!(error.pattern, "src/[");
    }

    #[test]
    fn normalization_flips_backslashes_and_keeps_foreign_paths() {
        assert_eq!(
            relative_to_root(Path::new("/proj"), "/proj/src/a.ts"),
            "src/a.ts"
        );
        assert_eq!(
            relative_to_root(Path::new("/proj"), "src\\win\\a.ts"),
            "src/win/a.ts"
        );
        assert_eq!(
            relative_to_root(Path::new("/proj"), "/elsewhere/b.ts"),
            "/elsewhere/b.ts"
        );
    }
}
