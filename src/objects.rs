//! Keyed value storage
//!
//! Two independent mappings owned by the container: `objects` holds typed
//! values bound under string keys (the `use` path), `globals` holds
//! JSON-shaped cross-cutting values. Double binds fail, missing objects
//! fail, missing globals are reported as absence.

use crate::error::{AssemblerError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

pub(crate) struct ObjectStore {
    objects: DashMap<String, Arc<dyn Any + Send + Sync>, RandomState>,
    globals: DashMap<String, Value, RandomState>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::with_hasher(RandomState::new()),
            globals: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Bind a typed value under a key. Fails if the key is taken.
    pub fn use_value<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) -> Result<()> {
        self.bind(key.into(), Arc::new(value))
    }

    /// Bind an already-erased value under a key. Fails if the key is taken.
    pub fn bind(&self, key: String, value: Arc<dyn Any + Send + Sync>) -> Result<()> {
        match self.objects.entry(key) {
            Entry::Occupied(entry) => Err(AssemblerError::DuplicateObject {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Retrieve the value bound under a key, downcast to `T`.
    pub fn object<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        let erased = self.object_raw(key)?;
        erased
            .downcast::<T>()
            .map_err(|_| AssemblerError::ObjectType {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn object_raw(&self, key: &str) -> Result<Arc<dyn Any + Send + Sync>> {
        self.objects
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AssemblerError::UnknownObject {
                key: key.to_string(),
            })
    }

    pub fn has(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Add a global. Fails if the key is taken.
    pub fn add_global(&self, key: impl Into<String>, value: Value) -> Result<()> {
        match self.globals.entry(key.into()) {
            Entry::Occupied(entry) => Err(AssemblerError::DuplicateObject {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Read a global; absence is not an error.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.globals.get(key).map(|entry| entry.value().clone())
    }

    pub fn clear(&self) {
        self.objects.clear();
        self.globals.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.globals.is_empty()
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("objects", &self.objects.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_use_and_require() {
        let store = ObjectStore::new();
        store.use_value("db.url", "postgres://localhost".to_string()).unwrap();

        let url = store.object::<String>("db.url").unwrap();
        assert_eq!(&*url, "postgres://localhost");
    }

    #[test]
    fn test_duplicate_use_fails() {
        let store = ObjectStore::new();
        store.use_value("token", 1u32).unwrap();
        let err = store.use_value("token", 2u32).unwrap_err();
        assert!(matches!(err, AssemblerError::DuplicateObject { .. }));
    }

    #[test]
    fn test_missing_object_fails() {
        let store = ObjectStore::new();
        let err = store.object::<String>("missing").unwrap_err();
        assert!(matches!(err, AssemblerError::UnknownObject { .. }));
    }

    #[test]
    fn test_wrong_type_reports_expected() {
        let store = ObjectStore::new();
        store.use_value("count", 3u64).unwrap();
        let err = store.object::<String>("count").unwrap_err();
        match err {
            AssemblerError::ObjectType { key, expected } => {
                assert_eq!(key, "count");
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_globals_absence_is_not_an_error() {
        let store = ObjectStore::new();
        assert_eq!(store.global("mode"), None);

        store.add_global("mode", json!("debug")).unwrap();
        assert_eq!(store.global("mode"), Some(json!("debug")));

        let err = store.add_global("mode", json!("release")).unwrap_err();
        assert!(matches!(err, AssemblerError::DuplicateObject { .. }));
    }

    #[test]
    fn test_clear_empties_both_maps() {
        let store = ObjectStore::new();
        store.use_value("a", 1u8).unwrap();
        store.add_global("b", json!(2)).unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
