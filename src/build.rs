//! Phased build orchestration
//!
//! `Assembler::build` drives the five phases: registration (with class
//! hooks, dependencies first), cycle reporting, resolution (the init queue
//! fills in construction order), the `on_init` drain with the root last
//! under its merged configuration, and the reverse `on_inited` drain with
//! the root first. Hooks are awaited one at a time, which is what makes
//! the documented ordering total for synchronous and asynchronous hooks
//! alike.

use crate::assemblage::Assemblage;
use crate::container::{Assembler, AssemblerInner};
use crate::cycles;
use crate::definition::Configuration;
use crate::error::{AssemblerError, Result};
use crate::injection::Injection;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

impl AssemblerInner {
    /// Walk the registry with the process-wide detector and report every
    /// cycle through the logger. Nothing is thrown here: the resolve phase
    /// fails with `CircularResolution` on the first cyclic require anyway.
    fn report_cycles(&self) {
        let cycles = cycles::detector().detect(&self.registry.graph());
        #[cfg(feature = "logging")]
        for cycle in &cycles {
            warn!(
                target: "assemblage",
                cycle = %cycle,
                "circular dependency in registry"
            );
        }
        let _ = cycles;
    }
}

impl Assembler {
    /// Compose an application from a root unit.
    ///
    /// Registers the root (forced singleton) and everything its definition
    /// contributes, reports cycles, resolves the whole tree, then drives
    /// `on_init` over the init queue in construction order — root last,
    /// with the caller configuration merged over the registered one — and
    /// `on_inited` in reverse. Returns the root typed by its interface.
    ///
    /// Hook failures propagate and leave the container partially
    /// initialized; callers are expected to [`dispose`](Assembler::dispose).
    pub async fn build<R: Assemblage>(
        &self,
        configuration: Option<Configuration>,
    ) -> Result<Arc<R::Interface>> {
        let injection = Injection::of::<R>();
        let root_identifier = self.inner.register_injection(&injection, true)?;

        self.inner.report_cycles();

        // The registry is frozen while the tree resolves; a hook or
        // constructor sneaking in a registration is a hard error.
        self.inner.lock_registry();
        let resolved = self
            .inner
            .require_record(&root_identifier, configuration.as_ref());
        self.inner.unlock_registry();
        let root = resolved?;

        let mut queue = std::mem::take(
            &mut *self
                .inner
                .init_queue
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        let root_entry = match queue
            .iter()
            .rposition(|entry| entry.identifier == root_identifier)
        {
            Some(position) => queue.remove(position),
            None => return Err(AssemblerError::MissingRoot),
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "assemblage",
            root = root_entry.concrete_name,
            constructed = queue.len() + 1,
            "tree resolved, running init hooks"
        );

        let context = self.inner.context();
        for entry in &queue {
            entry
                .lifecycle
                .on_init(&context, &entry.configuration)
                .await?;
        }
        root_entry
            .lifecycle
            .on_init(&context, &root_entry.configuration)
            .await?;

        root_entry
            .lifecycle
            .on_inited(&context, &root_entry.configuration)
            .await?;
        for entry in queue.iter().rev() {
            entry
                .lifecycle
                .on_inited(&context, &entry.configuration)
                .await?;
        }

        self.inner
            .init_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        root.downcast::<R::Interface>().ok_or_else(|| {
            AssemblerError::internal(format!(
                "root `{root_identifier}` does not expose the requested interface"
            ))
        })
    }
}
