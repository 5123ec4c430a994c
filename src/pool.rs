//! Sub-compiler pool
//!
//! One compiler instance per partition, created lazily on first diagnostic
//! request. Each instance is parameterized by exactly the partition's
//! matched files (plus the declaration files every instance must see) and
//! the project defaults shallow-merged with the rule's option delta. A
//! creation failure poisons only its own slot; it is never retried and
//! never cascades.

use std::sync::{Arc, RwLock};

use crate::config::CompilerOptions;
use crate::error::ConfigError;
use crate::host::InstanceFactory;
use crate::partition::{CompiledRule, PartitionMap};

enum PoolSlot<I> {
    Vacant,
    Ready(Arc<I>),
    Poisoned(ConfigError),
}

struct RuleSeed {
    /// Defaults merged with the rule's delta, rule wins on conflicts.
    merged_options: CompilerOptions,
    /// Pre-existing configuration error, e.g. a glob that failed to
    /// compile. Blocks instance creation for this slot.
    broken: Option<ConfigError>,
}

/// Owns the per-partition compiler instances for one overlay session.
pub struct SubCompilerPool<F: InstanceFactory> {
    factory: Arc<F>,
    seeds: Vec<RuleSeed>,
    slots: Vec<RwLock<PoolSlot<F::Instance>>>,
}

impl<F: InstanceFactory> SubCompilerPool<F> {
    pub fn new(factory: Arc<F>, default_options: &CompilerOptions, rules: &[CompiledRule]) -> Self {
        let seeds = rules
            .iter()
            .map(|rule| RuleSeed {
                merged_options: default_options.merged_with(&rule.options),
                broken: rule.config_error().cloned(),
            })
            .collect();
        let slots = rules.iter().map(|_| RwLock::new(PoolSlot::Vacant)).collect();

        Self {
            factory,
            seeds,
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The merged option set instances of partition `index` are created with.
    pub fn merged_options(&self, index: usize) -> &CompilerOptions {
        &self.seeds[index].merged_options
    }

    /// Fetch or lazily create the instance checking partition `index`.
    ///
    /// An empty partition still gets an instance; whole-project queries must
    /// enumerate every partition consistently, so empty ones are tolerated
    /// cheaply rather than skipped.
    pub fn get_or_create(
        &self,
        map: &PartitionMap,
        index: usize,
    ) -> Result<Arc<F::Instance>, ConfigError> {
        {
            let slot = self.slots[index].read().unwrap();
            match &*slot {
                PoolSlot::Ready(instance) => return Ok(Arc::clone(instance)),
                PoolSlot::Poisoned(error) => return Err(error.clone()),
                PoolSlot::Vacant => {}
            }
        }

        let mut slot = self.slots[index].write().unwrap();
        match &*slot {
            PoolSlot::Ready(instance) => return Ok(Arc::clone(instance)),
            PoolSlot::Poisoned(error) => return Err(error.clone()),
            PoolSlot::Vacant => {}
        }

        let seed = &self.seeds[index];
        if let Some(error) = &seed.broken {
            *slot = PoolSlot::Poisoned(error.clone());
            return Err(error.clone());
        }

        let partition = &map.partitions()[index];
        let mut root_files = partition.files.clone();
        root_files.extend(map.declaration_files().iter().cloned());

        log::trace!(
            "creating compiler instance for override rule {} with {} root files",
            index,
            root_files.len()
        );

        match self
            .factory
            .create_instance(root_files, seed.merged_options.clone())
        {
            Ok(instance) => {
                let instance = Arc::new(instance);
                *slot = PoolSlot::Ready(Arc::clone(&instance));
                Ok(instance)
            }
            Err(error) => {
                let error = ConfigError::InstanceCreation {
                    rule_index: index,
                    message: error.message,
                };
                log::warn!("{error}");
                *slot = PoolSlot::Poisoned(error.clone());
                Err(error)
            }
        }
    }
}
