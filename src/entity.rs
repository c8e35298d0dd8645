//! Entities bound in a namespace.
//!
//! A name resolves to either a nested [`Namespace`] or an opaque shared value.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::namespace::Namespace;

/// What a name is bound to.
///
/// Cloning is cheap: both variants are reference counted, so every clone
/// refers to the same underlying object.
///
/// # Example
///
/// ```rust
/// use lazyspace::Entity;
///
/// let flag = Entity::value(true);
/// assert!(flag.is::<bool>());
/// assert_eq!(flag.downcast_ref::<bool>(), Some(&true));
/// ```
#[derive(Clone)]
pub enum Entity {
    /// A nested namespace, which may host its own registry.
    Namespace(Arc<Namespace>),
    /// Any other value.
    Value(Arc<dyn Any + Send + Sync>),
}

impl Entity {
    /// Wrap a plain value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Entity::Value(Arc::new(value))
    }

    /// Returns the namespace if this entity is one.
    pub fn as_namespace(&self) -> Option<&Arc<Namespace>> {
        match self {
            Entity::Namespace(ns) => Some(ns),
            Entity::Value(_) => None,
        }
    }

    /// Consume the entity, returning the namespace if it is one.
    pub fn into_namespace(self) -> Option<Arc<Namespace>> {
        match self {
            Entity::Namespace(ns) => Some(ns),
            Entity::Value(_) => None,
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self, Entity::Namespace(_))
    }

    /// Check if this entity is a value of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        match self {
            Entity::Value(v) => v.as_ref().is::<T>(),
            Entity::Namespace(_) => false,
        }
    }

    /// Downcast a value entity to `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Entity::Value(v) => v.as_ref().downcast_ref::<T>(),
            Entity::Namespace(_) => None,
        }
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Namespace(a), Entity::Namespace(b)) => Arc::ptr_eq(a, b),
            (Entity::Value(a), Entity::Value(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<Namespace>> for Entity {
    fn from(ns: Arc<Namespace>) -> Self {
        Entity::Namespace(ns)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Namespace(ns) => f.debug_tuple("Namespace").field(&ns.path()).finish(),
            Entity::Value(_) => f.write_str("Value(..)"),
        }
    }
}
