//! Per-class annotation store
//!
//! A process-global side table mapping type identity to keyed JSON values.
//! The container records each registered unit's canonical definition here;
//! user code may attach its own annotations. All keys are namespaced with a
//! fixed prefix/suffix pair so user keys cannot collide with internal flags.

use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;

const KEY_PREFIX: &str = "assemblage.";
const KEY_SUFFIX: &str = ".annotation";

/// Internal flag marking a type as a registered unit
pub(crate) const FLAG_KEY: &str = "unit";
/// Key under which the canonical definition summary is stored
pub(crate) const DEFINITION_KEY: &str = "definition";

static STORE: Lazy<DashMap<TypeId, HashMap<String, Value>, RandomState>> =
    Lazy::new(|| DashMap::with_hasher(RandomState::new()));

#[inline]
fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}{KEY_SUFFIX}")
}

/// Attach an annotation to a type.
///
/// Overwrites any previous value under the same key.
#[inline]
pub fn set<T: ?Sized + 'static>(key: &str, value: Value) {
    set_raw(TypeId::of::<T>(), key, value);
}

#[inline]
pub(crate) fn set_raw(type_id: TypeId, key: &str, value: Value) {
    STORE.entry(type_id).or_default().insert(namespaced(key), value);
}

/// Read an annotation from a type.
#[inline]
pub fn get<T: ?Sized + 'static>(key: &str) -> Option<Value> {
    get_raw(TypeId::of::<T>(), key)
}

/// Read an annotation defined directly on a type.
///
/// Rust types carry no prototype chain, so this is the same lookup as
/// [`get`]; both entry points are kept so call sites can state intent.
#[inline]
pub fn get_own<T: ?Sized + 'static>(key: &str) -> Option<Value> {
    get::<T>(key)
}

#[inline]
pub(crate) fn get_raw(type_id: TypeId, key: &str) -> Option<Value> {
    STORE
        .get(&type_id)
        .and_then(|entry| entry.get(&namespaced(key)).cloned())
}

/// Record a unit's canonical definition at registration time.
pub(crate) fn record_definition(type_id: TypeId, definition: Value) {
    set_raw(type_id, FLAG_KEY, Value::Bool(true));
    set_raw(type_id, DEFINITION_KEY, definition);
}

/// Whether a type has been registered as a unit in any assembler.
#[inline]
pub fn is_unit<T: ?Sized + 'static>() -> bool {
    matches!(get::<T>(FLAG_KEY), Some(Value::Bool(true)))
}

/// The canonical definition summary stored for a registered unit.
#[inline]
pub fn definition_of<T: ?Sized + 'static>() -> Option<Value> {
    get::<T>(DEFINITION_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Annotated;
    struct Untouched;

    #[test]
    fn test_set_and_get() {
        set::<Annotated>("color", json!("red"));
        assert_eq!(get::<Annotated>("color"), Some(json!("red")));
        assert_eq!(get_own::<Annotated>("color"), Some(json!("red")));
        assert_eq!(get::<Untouched>("color"), None);
    }

    #[test]
    fn test_keys_are_namespaced() {
        set::<Annotated>("plain", json!(1));
        let entry = STORE.get(&TypeId::of::<Annotated>()).unwrap();
        assert!(entry.contains_key(&namespaced("plain")));
        assert!(!entry.contains_key("plain"));
    }

    #[test]
    fn test_definition_record() {
        assert!(!is_unit::<Untouched>());
        record_definition(TypeId::of::<Annotated>(), json!({"singleton": true}));
        assert!(is_unit::<Annotated>());
        assert_eq!(
            definition_of::<Annotated>(),
            Some(json!({"singleton": true}))
        );
    }
}
