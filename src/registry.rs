//! Ordered unit registry
//!
//! One [`Injectable`] record per registered identifier. The map itself is a
//! lock-free `DashMap`; insertion order is tracked separately because tag
//! queries and diagnostics report units in registration order. A record is
//! reserved in the map before its inject list recurses, which is what
//! terminates registration walks over mutually-injecting units.

use crate::context::BuildContext;
use crate::definition::{Configuration, Definition};
use crate::error::Result;
use crate::identifier::Identifier;
use crate::injection::{Buildable, ConstructFn, ErasedInstance, RegisterHookFn};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One registered unit.
pub(crate) struct Injectable {
    pub identifier: Identifier,
    pub concrete_id: TypeId,
    pub concrete_name: &'static str,
    pub configuration: Option<Configuration>,
    pub definition: Definition,
    pub dependencies: Vec<Identifier>,
    construct: ConstructFn,
    register_hook: RegisterHookFn,
    pub instance: Option<ErasedInstance>,
}

impl Injectable {
    pub fn new(buildable: Buildable) -> Self {
        Self {
            identifier: buildable.identifier,
            concrete_id: buildable.concrete_id,
            concrete_name: buildable.concrete_name,
            configuration: buildable.configuration,
            definition: buildable.definition,
            dependencies: buildable.dependencies,
            construct: buildable.construct,
            register_hook: buildable.register_hook,
            instance: buildable.instance,
        }
    }

    /// Construct an instance, or return the bound one (instance bindings
    /// skip construction and never enter the init queue).
    pub fn build(&self, ctx: &BuildContext) -> Result<ErasedInstance> {
        if let Some(instance) = &self.instance {
            return Ok(instance.clone());
        }
        (self.construct)(ctx)
    }

    pub fn run_register_hook(
        &self,
        context: &crate::context::AssemblerContext,
        configuration: &Configuration,
    ) -> Result<()> {
        (self.register_hook)(context, configuration)
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.definition.is_singleton()
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.definition.tags.iter().any(|candidate| candidate == tag)
    }
}

impl std::fmt::Debug for Injectable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injectable")
            .field("identifier", &self.identifier)
            .field("concrete", &self.concrete_name)
            .field("singleton", &self.is_singleton())
            .finish()
    }
}

pub(crate) struct Registry {
    records: DashMap<Identifier, Arc<Injectable>, RandomState>,
    order: Mutex<Vec<Identifier>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            records: DashMap::with_hasher(RandomState::new()),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, identifier: &Identifier) -> Option<Arc<Injectable>> {
        // Clone out of the shard guard so callers never hold it across a
        // recursive resolve.
        self.records
            .get(identifier)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.records.contains_key(identifier)
    }

    /// Reserve a record. The caller has already checked for duplicates.
    pub fn insert(&self, record: Arc<Injectable>) {
        let identifier = record.identifier.clone();
        self.records.insert(identifier.clone(), record);
        self.order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(identifier);
    }

    /// Identifiers in registration order.
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The identifier → dependency-identifiers mapping, for cycle walks.
    pub fn graph(&self) -> HashMap<Identifier, Vec<Identifier>> {
        self.identifiers()
            .into_iter()
            .filter_map(|identifier| {
                self.get(&identifier)
                    .map(|record| (identifier, record.dependencies.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
        self.order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("count", &self.len()).finish()
    }
}
