//! Resolution strategies
//!
//! A strategy turns a registered record into an instance. `Singleton`
//! memoizes per identifier; `Transient` constructs on every require and
//! keeps nothing. Both share one contract so further lifetimes can be
//! added without touching the container.

use crate::container::AssemblerInner;
use crate::definition::Configuration;
use crate::error::Result;
use crate::identifier::Identifier;
use crate::injection::ErasedInstance;
use crate::registry::Injectable;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

pub(crate) trait ResolutionStrategy: Send + Sync {
    fn resolve(
        &self,
        record: &Arc<Injectable>,
        assembler: &Arc<AssemblerInner>,
        configuration: Option<&Configuration>,
    ) -> Result<ErasedInstance>;
}

/// Memoizes one instance per identifier for the container's lifetime.
pub(crate) struct SingletonStrategy {
    cache: DashMap<Identifier, ErasedInstance, RandomState>,
}

impl SingletonStrategy {
    pub fn new() -> Self {
        Self {
            cache: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn cached(&self, identifier: &Identifier) -> bool {
        self.cache.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl ResolutionStrategy for SingletonStrategy {
    fn resolve(
        &self,
        record: &Arc<Injectable>,
        assembler: &Arc<AssemblerInner>,
        configuration: Option<&Configuration>,
    ) -> Result<ErasedInstance> {
        // Clone out of the guard before constructing: building a miss may
        // recurse into this strategy for another identifier.
        let hit = self
            .cache
            .get(&record.identifier)
            .map(|entry| entry.value().clone());
        if let Some(instance) = hit {
            #[cfg(feature = "logging")]
            trace!(
                target: "assemblage",
                identifier = %record.identifier,
                "singleton cache hit"
            );
            return Ok(instance);
        }

        let instance = assembler.construct(record, configuration)?;
        self.cache
            .insert(record.identifier.clone(), instance.clone());
        Ok(instance)
    }
}

/// Constructs a fresh instance on every require. Instances still enter the
/// init queue, so transients constructed during a build receive `on_init`;
/// ones constructed afterwards do not.
pub(crate) struct TransientStrategy;

impl ResolutionStrategy for TransientStrategy {
    fn resolve(
        &self,
        record: &Arc<Injectable>,
        assembler: &Arc<AssemblerInner>,
        configuration: Option<&Configuration>,
    ) -> Result<ErasedInstance> {
        #[cfg(feature = "logging")]
        trace!(
            target: "assemblage",
            identifier = %record.identifier,
            "transient construction"
        );
        assembler.construct(record, configuration)
    }
}
