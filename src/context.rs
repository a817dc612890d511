//! Container contexts
//!
//! Units never hold the container directly. During construction they see a
//! [`BuildContext`] — the slot surface that supplies dependencies, keyed
//! values, configuration and the emitter. At runtime they keep only the
//! restricted [`AssemblerContext`], a weak handle exposing the query and
//! event surface plus disposal.

use crate::container::{AssemblerInner, Tagged};
use crate::definition::{Configuration, Definition};
use crate::error::{AssemblerError, Result};
use crate::events::{Event, EventBus, ListenerId};
use crate::identifier::Identifier;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

/// Restricted facade handed to units for talking back to the container.
///
/// Holds the container weakly: a context outliving its assembler reports
/// `Disposed` instead of keeping the registry alive.
#[derive(Clone)]
pub struct AssemblerContext {
    inner: Weak<AssemblerInner>,
}

impl AssemblerContext {
    pub(crate) fn new(inner: Weak<AssemblerInner>) -> Self {
        Self { inner }
    }

    fn upgrade(&self) -> Result<Arc<AssemblerInner>> {
        self.inner.upgrade().ok_or(AssemblerError::Disposed)
    }

    /// Whether an identifier is registered.
    pub fn has<I: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.upgrade()
            .map(|inner| inner.has(&Identifier::of::<I>()))
            .unwrap_or(false)
    }

    /// Whether a keyed value is bound.
    pub fn has_key(&self, key: &str) -> bool {
        self.upgrade()
            .map(|inner| inner.objects.has(key))
            .unwrap_or(false)
    }

    /// Resolve a registered unit by its interface.
    pub fn require<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.upgrade()?.require_typed::<I>(None)
    }

    /// Resolve a unit if registered; `None` when the identifier is absent.
    pub fn require_optional<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>> {
        let inner = self.upgrade()?;
        if !inner.has(&Identifier::of::<I>()) {
            return Ok(None);
        }
        inner.require_typed::<I>(None).map(Some)
    }

    /// Resolve a keyed value from the object store.
    pub fn require_object<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        self.upgrade()?.objects.object::<T>(key)
    }

    /// The concrete type name registered under an interface.
    pub fn concrete<I: ?Sized + Send + Sync + 'static>(&self) -> Option<&'static str> {
        self.upgrade()
            .ok()
            .and_then(|inner| inner.concrete(&Identifier::of::<I>()))
    }

    /// Every unit carrying any of the given tags, in registration order per
    /// tag. A unit carrying several of the requested tags appears once per
    /// carried tag.
    pub fn tagged(&self, tags: &[&str]) -> Result<Vec<Tagged>> {
        self.upgrade()?.tagged(tags)
    }

    /// Read a global; absence is not an error.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.upgrade().ok().and_then(|inner| inner.objects.global(key))
    }

    /// The container's registered event channels.
    pub fn events(&self) -> Vec<String> {
        self.upgrade()
            .map(|inner| inner.bus.channels())
            .unwrap_or_default()
    }

    /// Subscribe to a container channel (or `*`).
    pub fn on<F>(&self, channel: impl Into<String>, callback: F) -> Result<ListenerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Ok(self.upgrade()?.bus.on(channel, callback))
    }

    /// Subscribe for a single delivery.
    pub fn once<F>(&self, channel: impl Into<String>, callback: F) -> Result<ListenerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Ok(self.upgrade()?.bus.once(channel, callback))
    }

    /// Remove a container-level listener.
    pub fn off(&self, channel: &str, id: ListenerId) -> bool {
        self.upgrade()
            .map(|inner| inner.bus.off(channel, id))
            .unwrap_or(false)
    }

    /// Tear the container down. Idempotent; a no-op once the assembler is
    /// gone.
    pub async fn dispose(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispose().await;
        }
    }
}

impl std::fmt::Debug for AssemblerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblerContext")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Zero-argument disposal handle, the slot equivalent of
/// [`AssemblerContext::dispose`].
#[derive(Clone)]
pub struct Disposer {
    inner: Weak<AssemblerInner>,
}

impl Disposer {
    pub(crate) fn new(inner: Weak<AssemblerInner>) -> Self {
        Self { inner }
    }

    /// Tear the owning container down.
    pub async fn dispose(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispose().await;
        }
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Disposer")
    }
}

/// Construction-time slot surface.
///
/// Everything a unit's `assemble` can ask for comes through here: recursive
/// dependencies, the effective configuration, the normalized definition,
/// keyed values, globals, the public context, a disposer and the unit's
/// own emitter.
pub struct BuildContext {
    pub(crate) inner: Arc<AssemblerInner>,
    identifier: Identifier,
    configuration: Configuration,
    definition: Definition,
    bus: EventBus,
}

impl BuildContext {
    pub(crate) fn new(
        inner: Arc<AssemblerInner>,
        identifier: Identifier,
        configuration: Configuration,
        definition: Definition,
        bus: EventBus,
    ) -> Self {
        Self {
            inner,
            identifier,
            configuration,
            definition,
            bus,
        }
    }

    /// Identifier of the unit under construction.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The public context, for units that talk to the container later.
    pub fn context(&self) -> AssemblerContext {
        AssemblerContext::new(Arc::downgrade(&self.inner))
    }

    /// Effective configuration for this unit (registered merged with the
    /// caller's override).
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The unit's normalized definition.
    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    /// The definition's opaque metadata record.
    pub fn metadata(&self) -> &Map<String, Value> {
        self.definition.metadata_record()
    }

    /// A zero-argument disposal handle.
    pub fn disposer(&self) -> Disposer {
        Disposer::new(Arc::downgrade(&self.inner))
    }

    /// Resolve a constructor dependency.
    pub fn require<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.inner.require_typed::<I>(None)
    }

    /// Resolve a dependency if registered; `None` when absent.
    pub fn require_optional<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>> {
        if !self.inner.has(&Identifier::of::<I>()) {
            return Ok(None);
        }
        self.inner.require_typed::<I>(None).map(Some)
    }

    /// A keyed value from the object store; fails when missing.
    pub fn object<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        self.inner.objects.object::<T>(key)
    }

    /// A global value; absence is not an error.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.inner.objects.global(key)
    }

    /// The unit's own event bus, pre-registered with its declared channels.
    ///
    /// Emits on channels the definition did not declare are silently
    /// dropped. Declared channels are forwarded to the container once the
    /// unit is constructed.
    pub fn emitter(&self) -> EventBus {
        self.bus.clone()
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("identifier", &self.identifier)
            .finish()
    }
}
