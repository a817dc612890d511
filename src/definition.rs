//! Unit definitions and their validation
//!
//! A definition is the normalized descriptor of a unit: its lifetime flag,
//! the injections and keyed values it contributes at registration, the tags
//! it can be queried by, the event channels it emits on, opaque metadata and
//! cross-cutting globals. The option set is closed; the raw-value path
//! rejects anything it does not recognize.

use crate::error::{AssemblerError, Result};
use crate::injection::{Injection, UseBinding};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Configuration handed to a unit at construction and in lifecycle hooks.
///
/// Merging follows last-wins semantics: caller-supplied entries override
/// registered ones key by key.
pub type Configuration = Map<String, Value>;

/// Merge a registered configuration with a caller override.
pub(crate) fn merge_configurations(
    base: Option<&Configuration>,
    overrides: Option<&Configuration>,
) -> Configuration {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Normalized descriptor of a unit.
///
/// Built either through the typed builder methods or from a raw JSON value
/// via [`Definition::from_value`]. The recognized options mirror the closed
/// set the validator accepts: `singleton`, `inject`, `use`, `tags`,
/// `events`, `metadata` and `global`.
///
/// ```rust
/// use assemblage::Definition;
///
/// let definition = Definition::new()
///     .singleton(false)
///     .tag("repository")
///     .event("repo:ready");
/// assert!(!definition.is_singleton());
/// ```
#[derive(Clone, Default)]
pub struct Definition {
    pub(crate) singleton: Option<bool>,
    pub(crate) tags: Vec<String>,
    pub(crate) events: Vec<String>,
    pub(crate) metadata: Map<String, Value>,
    pub(crate) globals: Map<String, Value>,
    pub(crate) inject: Vec<Injection>,
    pub(crate) uses: Vec<UseBinding>,
}

impl Definition {
    /// Create an empty definition (singleton by default).
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lifetime flag. `true` (the default) memoizes one instance
    /// per identifier; `false` constructs a fresh instance on every require.
    #[inline]
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = Some(singleton);
        self
    }

    /// Declare a registration contribution.
    #[inline]
    pub fn inject(mut self, injection: Injection) -> Self {
        self.inject.push(injection);
        self
    }

    /// Bind a value under a string key in the object store.
    pub fn use_value<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.uses.push(UseBinding::Value {
            key: key.into(),
            value: Arc::new(value),
        });
        self
    }

    /// Bind a pre-built instance to its interface identifier.
    ///
    /// The instance skips construction and receives no lifecycle hooks.
    pub fn use_instance<C: crate::Assemblage>(mut self, instance: Arc<C>) -> Self {
        self.uses.push(UseBinding::Instance(Injection::instance(instance)));
        self
    }

    /// Add one tag this unit can be queried by.
    #[inline]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags at once.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Declare one event channel this unit emits on.
    #[inline]
    pub fn event(mut self, channel: impl Into<String>) -> Self {
        self.events.push(channel.into());
        self
    }

    /// Declare several event channels at once.
    pub fn events<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events.extend(channels.into_iter().map(Into::into));
        self
    }

    /// Attach an opaque metadata entry, exposed back to the unit through
    /// its construction context.
    #[inline]
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Contribute a cross-cutting global value.
    #[inline]
    pub fn global(mut self, key: impl Into<String>, value: Value) -> Self {
        self.globals.insert(key.into(), value);
        self
    }

    /// Effective lifetime: singleton unless explicitly declared `false`.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.singleton != Some(false)
    }

    /// Declared tags.
    #[inline]
    pub fn declared_tags(&self) -> &[String] {
        &self.tags
    }

    /// Declared event channels.
    #[inline]
    pub fn declared_events(&self) -> &[String] {
        &self.events
    }

    /// Opaque metadata record.
    #[inline]
    pub fn metadata_record(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Parse a raw JSON definition.
    ///
    /// Recognizes the value-shaped subset of the option set (`singleton`,
    /// `tags`, `events`, `metadata`, `global`); injections and instance
    /// bindings carry types and only exist on the builder path. Unknown
    /// options and mis-shaped values fail with `InvalidDefinition`.
    ///
    /// Scalars are normalized: a bare string under `tags` or `events`
    /// becomes a one-element list.
    pub fn from_value(value: Value) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(AssemblerError::invalid_definition(
                    "definition",
                    format!("expected an object, got {other}"),
                ));
            }
        };

        let mut definition = Definition::new();
        for (option, value) in object {
            match option.as_str() {
                "singleton" => match value {
                    Value::Bool(flag) => definition.singleton = Some(flag),
                    other => {
                        return Err(AssemblerError::invalid_definition(
                            "singleton",
                            format!("expected a boolean, got {other}"),
                        ));
                    }
                },
                "tags" => definition.tags = string_list("tags", value)?,
                "events" => definition.events = string_list("events", value)?,
                "metadata" => definition.metadata = object_map("metadata", value)?,
                "global" => definition.globals = object_map("global", value)?,
                unknown => {
                    return Err(AssemblerError::invalid_definition(
                        unknown,
                        "unrecognized option",
                    ));
                }
            }
        }
        definition.normalized()
    }

    /// Run the per-option predicates and return the canonical form.
    ///
    /// An absent `singleton` flag becomes an explicit `true`; empty tag or
    /// channel names are rejected.
    pub(crate) fn normalized(mut self) -> Result<Self> {
        if self.singleton.is_none() {
            self.singleton = Some(true);
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Err(AssemblerError::invalid_definition(
                "tags",
                "tag names must not be empty",
            ));
        }
        if self.events.iter().any(|channel| channel.is_empty()) {
            return Err(AssemblerError::invalid_definition(
                "events",
                "channel names must not be empty",
            ));
        }
        if self.events.iter().any(|channel| channel == crate::events::WILDCARD) {
            return Err(AssemblerError::invalid_definition(
                "events",
                "the wildcard channel is implicit and cannot be declared",
            ));
        }
        Ok(self)
    }

    /// JSON summary stored in the metadata side table.
    pub(crate) fn describe(&self) -> Value {
        let mut summary = Map::new();
        summary.insert("singleton".into(), Value::Bool(self.is_singleton()));
        summary.insert(
            "tags".into(),
            Value::Array(self.tags.iter().cloned().map(Value::String).collect()),
        );
        summary.insert(
            "events".into(),
            Value::Array(self.events.iter().cloned().map(Value::String).collect()),
        );
        summary.insert("metadata".into(), Value::Object(self.metadata.clone()));
        summary.insert("global".into(), Value::Object(self.globals.clone()));
        Value::Object(summary)
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("singleton", &self.is_singleton())
            .field("tags", &self.tags)
            .field("events", &self.events)
            .field("inject", &self.inject.len())
            .field("uses", &self.uses.len())
            .finish()
    }
}

fn string_list(option: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::String(single) => Ok(vec![single]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(AssemblerError::invalid_definition(
                    option,
                    format!("expected a string entry, got {other}"),
                )),
            })
            .collect(),
        other => Err(AssemblerError::invalid_definition(
            option,
            format!("expected a string or list of strings, got {other}"),
        )),
    }
}

fn object_map(option: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AssemblerError::invalid_definition(
            option,
            format!("expected an object, got {other}"),
        )),
    }
}
