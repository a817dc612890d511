//! Registration identifiers
//!
//! An identifier is the name a unit or value is registered under. Class-like
//! identifiers are `TypeId`s of the unit's interface type, which may be the
//! concrete struct itself or a `dyn Trait` object type standing in for an
//! abstract binding. String identifiers address the object store.

use std::any::TypeId;
use std::fmt;

/// The key under which a unit or value is registered.
///
/// Equality is `TypeId` identity for class-like identifiers and string
/// equality for keyed values. The two kinds never collide: they live in
/// separate maps inside the container.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A concrete struct or `dyn Trait` interface type
    Type {
        /// Type identity used as the registry key
        id: TypeId,
        /// Pre-monomorphization type name, kept for diagnostics
        name: &'static str,
    },
    /// A string key addressing the object store
    Key(String),
}

impl Identifier {
    /// Identifier for an interface type.
    ///
    /// `I` may be unsized, so `dyn Trait` works:
    ///
    /// ```rust
    /// use assemblage::Identifier;
    ///
    /// trait Logger: Send + Sync {}
    /// struct ConsoleLogger;
    ///
    /// let abstract_id = Identifier::of::<dyn Logger>();
    /// let concrete_id = Identifier::of::<ConsoleLogger>();
    /// assert_ne!(abstract_id, concrete_id);
    /// ```
    #[inline]
    pub fn of<I: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<I>(),
            name: std::any::type_name::<I>(),
        }
    }

    /// Identifier for a keyed value in the object store.
    #[inline]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Human-readable name of this identifier.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Key(key) => key,
        }
    }

    /// Whether this identifier addresses the class registry.
    #[inline]
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type { .. })
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => write!(f, "Identifier::Type({name})"),
            Self::Key(key) => write!(f, "Identifier::Key({key:?})"),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Abstract: Send + Sync {}
    struct Concrete;
    impl Abstract for Concrete {}

    #[test]
    fn test_type_identity() {
        assert_eq!(Identifier::of::<Concrete>(), Identifier::of::<Concrete>());
        assert_ne!(Identifier::of::<Concrete>(), Identifier::of::<dyn Abstract>());
    }

    #[test]
    fn test_key_identity() {
        assert_eq!(Identifier::key("db.url"), Identifier::key("db.url"));
        assert_ne!(Identifier::key("db.url"), Identifier::key("db.host"));
    }

    #[test]
    fn test_name_is_displayed() {
        let id = Identifier::of::<Concrete>();
        assert!(id.to_string().contains("Concrete"));
        assert_eq!(Identifier::key("k").to_string(), "k");
    }

    #[test]
    fn test_is_type_partitions_the_kinds() {
        assert!(Identifier::of::<Concrete>().is_type());
        assert!(Identifier::of::<dyn Abstract>().is_type());
        assert!(!Identifier::key("db.url").is_type());
    }
}
