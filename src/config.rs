//! Overlay configuration surface
//!
//! Consumed, never produced: an ordered list of override rules (glob list
//! plus a partial compiler-option set) and an optional top-level ignore
//! list. The same structure is accepted by the batch and the incremental
//! entry points. Declaration order carries meaning: later rules win when a
//! file matches several.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Partial compiler-option set, keyed by host option name.
///
/// Stored insertion-ordered so merged option sets serialize and render
/// deterministically. Values are opaque to the overlay; only the host
/// compiler interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions {
    options: IndexMap<String, Value>,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(key.into(), value.into());
    }

    /// Builder-style `set`, convenient when assembling option sets inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Read a boolean option, `None` when absent or not a boolean.
    pub fn bool_flag(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow merge: every key of `delta` replaces the same key here,
    /// nested values are not merged recursively. The delta wins on conflict.
    pub fn merged_with(&self, delta: &CompilerOptions) -> CompilerOptions {
        let mut merged = self.clone();
        for (key, value) in &delta.options {
            merged.options.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// One override rule: which files it claims and the option delta applied on
/// top of the project defaults for those files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRule {
    /// Root-relative glob patterns selecting the rule's files.
    pub files: Vec<String>,
    /// Partial option set merged over the project defaults, rule wins.
    #[serde(default)]
    pub compiler_options: CompilerOptions,
}

impl OverrideRule {
    pub fn new(files: Vec<String>, compiler_options: CompilerOptions) -> Self {
        Self {
            files,
            compiler_options,
        }
    }
}

/// Complete overlay configuration: the ordered rule list plus the optional
/// ignore list. Files matching `ignores` never reach any compiler instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

impl OverlayConfig {
    /// Parse a JSON configuration object, e.g. the plugin block a build tool
    /// hands through verbatim.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|error| ConfigError::Parse {
            message: error.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.ignores.is_empty()
    }
}
