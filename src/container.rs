//! The assembler: registry owner and resolution engine
//!
//! The container owns every long-lived structure: the unit registry, the
//! object store, the strategy caches, the init queue, the constructed list
//! driving teardown order and the container-level event bus. Resolution is
//! stack-tracked so cyclic requires fail with the offending path and
//! unknown identifiers report who asked for them.

use crate::context::{AssemblerContext, BuildContext};
use crate::definition::{Configuration, merge_configurations};
use crate::error::{AssemblerError, Result};
use crate::events::{Event, EventBus, ListenerId};
use crate::identifier::Identifier;
use crate::injection::{ErasedInstance, Injection};
use crate::metadata;
use crate::objects::ObjectStore;
use crate::registry::{Injectable, Registry};
use crate::strategy::{ResolutionStrategy, SingletonStrategy, TransientStrategy};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Entry awaiting its `on_init`/`on_inited` calls, in construction order.
pub(crate) struct InitEntry {
    pub identifier: Identifier,
    pub concrete_name: &'static str,
    pub lifecycle: Arc<dyn crate::Lifecycle>,
    pub configuration: Configuration,
}

/// Constructed instance retained for teardown, with its forwarding wiring.
struct DisposeEntry {
    concrete_name: &'static str,
    lifecycle: Arc<dyn crate::Lifecycle>,
    configuration: Configuration,
    unit_bus: EventBus,
    forwarded: Vec<(String, ListenerId)>,
}

pub(crate) struct AssemblerInner {
    pub(crate) registry: Registry,
    pub(crate) objects: ObjectStore,
    pub(crate) singleton: SingletonStrategy,
    transient: TransientStrategy,
    stack: Mutex<Vec<Identifier>>,
    pub(crate) init_queue: Mutex<Vec<InitEntry>>,
    constructed: Mutex<Vec<DisposeEntry>>,
    pub(crate) bus: EventBus,
    locked: AtomicBool,
    disposed: AtomicBool,
}

impl AssemblerInner {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            objects: ObjectStore::new(),
            singleton: SingletonStrategy::new(),
            transient: TransientStrategy,
            stack: Mutex::new(Vec::new()),
            init_queue: Mutex::new(Vec::new()),
            constructed: Mutex::new(Vec::new()),
            bus: EventBus::new(),
            locked: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn context(self: &Arc<Self>) -> AssemblerContext {
        AssemblerContext::new(Arc::downgrade(self))
    }

    pub(crate) fn has(&self, identifier: &Identifier) -> bool {
        match identifier {
            Identifier::Type { .. } => self.registry.contains(identifier),
            Identifier::Key(key) => self.objects.has(key),
        }
    }

    pub(crate) fn concrete(&self, identifier: &Identifier) -> Option<&'static str> {
        self.registry.get(identifier).map(|record| record.concrete_name)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Freeze registration for the duration of the resolve phase.
    pub(crate) fn lock_registry(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub(crate) fn unlock_registry(&self) {
        self.locked.store(false, Ordering::Release);
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an injection and, depth-first, everything it contributes.
    ///
    /// The record is reserved before its inject list recurses, so two units
    /// injecting each other terminate on the presence check. A second
    /// registration under the same identifier is a no-op when it names the
    /// same concrete (first wins) and an error otherwise.
    pub(crate) fn register_injection(
        self: &Arc<Self>,
        injection: &Injection,
        root: bool,
    ) -> Result<Identifier> {
        if self.is_disposed() {
            return Err(AssemblerError::Disposed);
        }
        if self.locked.load(Ordering::Acquire) {
            return Err(AssemblerError::Locked);
        }

        let identifier = injection.identifier.clone();
        if let Some(existing) = self.registry.get(&identifier) {
            if existing.concrete_id == injection.concrete_id {
                return Ok(identifier);
            }
            let name = match &identifier {
                Identifier::Type { name, .. } => *name,
                Identifier::Key(_) => "<key>",
            };
            return Err(AssemblerError::DuplicateRegistration {
                identifier: name,
                existing: existing.concrete_name,
                attempted: injection.concrete_name,
            });
        }

        let mut buildable = injection.resolve()?;
        if root {
            // The root is always shared.
            buildable.definition.singleton = Some(true);
        }
        let record = Arc::new(Injectable::new(buildable));
        self.registry.insert(Arc::clone(&record));

        let mut summary = record.definition.describe();
        if let Value::Object(map) = &mut summary {
            map.insert(
                "dependencies".into(),
                Value::Array(
                    record
                        .dependencies
                        .iter()
                        .map(|dependency| Value::String(dependency.name().to_string()))
                        .collect(),
                ),
            );
        }
        metadata::record_definition(record.concrete_id, summary);

        #[cfg(feature = "logging")]
        debug!(
            target: "assemblage",
            identifier = %record.identifier,
            concrete = record.concrete_name,
            singleton = record.is_singleton(),
            registered = self.registry.len(),
            "unit registered"
        );

        for child in record.definition.inject.clone() {
            self.register_injection(&child, false)?;
        }
        for binding in record.definition.uses.clone() {
            match binding {
                crate::injection::UseBinding::Value { key, value } => {
                    self.objects.bind(key, value)?;
                }
                crate::injection::UseBinding::Instance(instance) => {
                    self.register_injection(&instance, false)?;
                }
            }
        }
        for (key, value) in record.definition.globals.clone() {
            self.objects.add_global(key, value)?;
        }

        // Dependencies have finished registering by now, so their class
        // hooks have already fired.
        let configuration = record.configuration.clone().unwrap_or_default();
        record.run_register_hook(&self.context(), &configuration)?;

        Ok(identifier)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    pub(crate) fn require_typed<I: ?Sized + Send + Sync + 'static>(
        self: &Arc<Self>,
        configuration: Option<&Configuration>,
    ) -> Result<Arc<I>> {
        let identifier = Identifier::of::<I>();
        let instance = self.require_record(&identifier, configuration)?;
        instance.downcast::<I>().ok_or_else(|| {
            AssemblerError::internal(format!(
                "instance registered under `{identifier}` does not expose that interface"
            ))
        })
    }

    pub(crate) fn require_record(
        self: &Arc<Self>,
        identifier: &Identifier,
        configuration: Option<&Configuration>,
    ) -> Result<ErasedInstance> {
        if self.is_disposed() {
            return Err(AssemblerError::Disposed);
        }

        {
            let stack = self.stack.lock().unwrap_or_else(|e| e.into_inner());
            if stack.contains(identifier) {
                let mut names: Vec<&str> = stack.iter().map(Identifier::name).collect();
                names.push(identifier.name());
                return Err(AssemblerError::CircularResolution {
                    path: names.join(" -> "),
                });
            }
        }

        let Some(record) = self.registry.get(identifier) else {
            let stack = self.stack.lock().unwrap_or_else(|e| e.into_inner());
            let requester = stack
                .last()
                .map(|caller| caller.name().to_string())
                .unwrap_or_else(|| "<caller>".to_string());
            let names: Vec<&str> = stack.iter().map(Identifier::name).collect();
            return Err(AssemblerError::UnknownDependency {
                requested: identifier.name().to_string(),
                requester,
                stack: names.join(" -> "),
            });
        };

        self.stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(identifier.clone());
        let resolved = if record.is_singleton() {
            self.singleton.resolve(&record, self, configuration)
        } else {
            self.transient.resolve(&record, self, configuration)
        };
        self.stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();
        resolved
    }

    /// Construct an instance for a record: merge configurations, run the
    /// unit's assembly against a fresh build context, wire its declared
    /// channels into the container bus and append it to the init queue.
    pub(crate) fn construct(
        self: &Arc<Self>,
        record: &Arc<Injectable>,
        caller: Option<&Configuration>,
    ) -> Result<ErasedInstance> {
        // Instance bindings skip construction: no bus, no queue, no hooks.
        if let Some(instance) = &record.instance {
            return Ok(instance.clone());
        }

        let configuration = merge_configurations(record.configuration.as_ref(), caller);
        let events = record.definition.declared_events().to_vec();
        let bus = EventBus::with_channels(events.iter().cloned());
        let ctx = BuildContext::new(
            Arc::clone(self),
            record.identifier.clone(),
            configuration.clone(),
            record.definition.clone(),
            bus.clone(),
        );
        let instance = record.build(&ctx)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "assemblage",
            identifier = %record.identifier,
            concrete = record.concrete_name,
            channels = events.len(),
            "unit constructed"
        );

        let mut forwarded = Vec::new();
        if !events.is_empty() {
            self.bus.add_channels(events.iter().cloned());
            let upstream = Arc::downgrade(self);
            for channel in &events {
                let container = upstream.clone();
                let id = bus.on(channel.clone(), move |event: &Event| {
                    if let Some(container) = container.upgrade() {
                        container.bus.emit(event.channel(), event.payload_any());
                    }
                });
                forwarded.push((channel.clone(), id));
            }
        }

        self.init_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(InitEntry {
                identifier: record.identifier.clone(),
                concrete_name: record.concrete_name,
                lifecycle: instance.lifecycle(),
                configuration: configuration.clone(),
            });
        self.constructed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DisposeEntry {
                concrete_name: record.concrete_name,
                lifecycle: instance.lifecycle(),
                configuration,
                unit_bus: bus,
                forwarded,
            });

        Ok(instance)
    }

    /// Linear scan of the registry in registration order, once per
    /// requested tag. A unit carrying several requested tags is returned
    /// once per carried tag, first-tag-first.
    pub(crate) fn tagged(self: &Arc<Self>, tags: &[&str]) -> Result<Vec<Tagged>> {
        let order = self.registry.identifiers();
        let mut matches = Vec::new();
        for tag in tags {
            for identifier in &order {
                let Some(record) = self.registry.get(identifier) else {
                    continue;
                };
                if record.has_tag(tag) {
                    let instance = self.require_record(identifier, None)?;
                    matches.push(Tagged {
                        identifier: identifier.clone(),
                        concrete_name: record.concrete_name,
                        instance,
                    });
                }
            }
        }
        Ok(matches)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Tear everything down: unregister forwarding, dispose unit buses,
    /// run `on_dispose` hooks dependents-first, clear all internal state.
    /// Idempotent — the second call finds the flag set and returns.
    pub(crate) async fn dispose(self: &Arc<Self>) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "assemblage",
            registered = self.registry.len(),
            "disposing assembler"
        );

        let entries = std::mem::take(
            &mut *self.constructed.lock().unwrap_or_else(|e| e.into_inner()),
        );
        let context = self.context();
        for entry in entries.iter().rev() {
            for (channel, id) in &entry.forwarded {
                entry.unit_bus.off(channel, *id);
            }
            entry.unit_bus.dispose();
            if let Err(_error) = entry
                .lifecycle
                .on_dispose(&context, &entry.configuration)
                .await
            {
                #[cfg(feature = "logging")]
                warn!(
                    target: "assemblage",
                    unit = entry.concrete_name,
                    error = %_error,
                    "onDispose hook failed"
                );
            }
        }

        self.bus.dispose();
        self.registry.clear();
        self.objects.clear();
        self.singleton.clear();
        self.init_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.stack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// A unit matched by a tag query.
pub struct Tagged {
    identifier: Identifier,
    concrete_name: &'static str,
    instance: ErasedInstance,
}

impl Tagged {
    /// Identifier the unit is registered under.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Concrete type name of the resolved instance.
    pub fn concrete_name(&self) -> &'static str {
        self.concrete_name
    }

    /// The resolved instance, typed by its registered interface.
    pub fn instance<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.instance.downcast::<I>()
    }
}

impl std::fmt::Debug for Tagged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tagged")
            .field("identifier", &self.identifier)
            .field("concrete", &self.concrete_name)
            .finish()
    }
}

/// The dependency-injection container.
///
/// Owns the registry, the object store and the event surface. Built trees
/// come out of [`Assembler::build`](crate::Assembler::build); everything
/// else on this type is the query-and-registration contract shared with
/// the public context.
///
/// Cloning yields another handle to the same container.
#[derive(Clone)]
pub struct Assembler {
    pub(crate) inner: Arc<AssemblerInner>,
}

impl Assembler {
    /// Create an empty container.
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "assemblage", "creating assembler");

        Self {
            inner: Arc::new(AssemblerInner::new()),
        }
    }

    /// The restricted context units receive.
    pub fn context(&self) -> AssemblerContext {
        self.inner.context()
    }

    /// Register an injection (and its contributions) outside a build.
    pub fn register(&self, injection: Injection) -> Result<Identifier> {
        self.inner.register_injection(&injection, false)
    }

    /// Bind a typed value under a string key. Fails if the key is taken.
    pub fn use_value<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<()> {
        self.inner.objects.use_value(key, value)
    }

    /// Add a global. Fails if the key is taken.
    pub fn add_global(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.inner.objects.add_global(key, value)
    }

    /// Read a global; absence is not an error.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.inner.objects.global(key)
    }

    /// Whether an interface is registered.
    pub fn has<I: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.inner.has(&Identifier::of::<I>())
    }

    /// Whether a keyed value is bound.
    pub fn has_key(&self, key: &str) -> bool {
        self.inner.objects.has(key)
    }

    /// The concrete type name registered under an interface.
    pub fn concrete<I: ?Sized + Send + Sync + 'static>(&self) -> Option<&'static str> {
        self.inner.concrete(&Identifier::of::<I>())
    }

    /// Resolve a registered unit by its interface.
    pub fn require<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.inner.require_typed::<I>(None)
    }

    /// Resolve a unit with a caller configuration override.
    pub fn require_with<I: ?Sized + Send + Sync + 'static>(
        &self,
        configuration: &Configuration,
    ) -> Result<Arc<I>> {
        self.inner.require_typed::<I>(Some(configuration))
    }

    /// Resolve a keyed value from the object store.
    pub fn require_object<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        self.inner.objects.object::<T>(key)
    }

    /// Every unit carrying any of the given tags, in registration order.
    pub fn tagged(&self, tags: &[&str]) -> Result<Vec<Tagged>> {
        self.inner.tagged(tags)
    }

    /// The container's registered event channels.
    pub fn events(&self) -> Vec<String> {
        self.inner.bus.channels()
    }

    /// Subscribe to a container channel (or `*`).
    pub fn on<F>(&self, channel: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.on(channel, callback)
    }

    /// Subscribe for a single delivery.
    pub fn once<F>(&self, channel: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.once(channel, callback)
    }

    /// Remove a container-level listener.
    pub fn off(&self, channel: &str, id: ListenerId) -> bool {
        self.inner.bus.off(channel, id)
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Tear the container down. Idempotent.
    pub async fn dispose(&self) {
        self.inner.dispose().await;
    }

    /// Whether the container has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("registered", &self.len())
            .field("channels", &self.inner.bus.channels().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
