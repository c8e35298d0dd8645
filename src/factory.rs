//! Factory and initializer callbacks.
//!
//! Factories compete to bind a missing name; initializers configure whatever
//! was bound. Plain closures implement both traits, so most callers never
//! name a type:
//!
//! ```rust
//! use std::sync::Arc;
//! use lazyspace::{CanonicalName, Entity, Key, LazyspaceResult, Namespace};
//!
//! let root = Namespace::new("App");
//! let registry = root.attach_registry();
//! registry.add_factory(
//!     Key::Wildcard,
//!     |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
//!         ns.set(name, Entity::value(name.to_string()));
//!         Ok(())
//!     },
//! );
//! assert!(root.resolve("anything").is_ok());
//! ```

use std::sync::Arc;

use crate::entity::Entity;
use crate::error::{FactoryError, LazyspaceResult};
use crate::name::CanonicalName;
use crate::namespace::Namespace;

/// A callback that may materialize and bind an entity for a missing name.
///
/// A factory signals success only by binding `name` in `namespace`; returning
/// `Ok(())` without binding lets the next factory in the chain try. Errors
/// abort the search and propagate to the reference site.
pub trait Factory: Send + Sync {
    fn create(&self, namespace: &Arc<Namespace>, name: &CanonicalName) -> LazyspaceResult<()>;

    /// Short description used in log output.
    fn label(&self) -> &str {
        "anonymous"
    }
}

impl<F> Factory for F
where
    F: Fn(&Arc<Namespace>, &CanonicalName) -> LazyspaceResult<()> + Send + Sync,
{
    fn create(&self, namespace: &Arc<Namespace>, name: &CanonicalName) -> LazyspaceResult<()> {
        self(namespace, name)
    }
}

/// A setup step run against a freshly bound entity.
pub trait Initializer: Send + Sync {
    fn initialize(&self, entity: &Entity) -> LazyspaceResult<()>;

    fn label(&self) -> &str {
        "anonymous"
    }
}

impl<F> Initializer for F
where
    F: Fn(&Entity) -> LazyspaceResult<()> + Send + Sync,
{
    fn initialize(&self, entity: &Entity) -> LazyspaceResult<()> {
        self(entity)
    }
}

/// Initializer that only accepts namespace entities.
///
/// Created by [`on_namespace`].
pub struct NamespaceInitializer<F> {
    f: F,
}

impl<F> Initializer for NamespaceInitializer<F>
where
    F: Fn(&Arc<Namespace>) -> LazyspaceResult<()> + Send + Sync,
{
    fn initialize(&self, entity: &Entity) -> LazyspaceResult<()> {
        match entity.as_namespace() {
            Some(ns) => (self.f)(ns),
            None => Err(FactoryError::Unsupported(format!(
                "namespace initializer applied to {:?}",
                entity
            ))
            .into()),
        }
    }

    fn label(&self) -> &str {
        "namespace"
    }
}

/// Wrap a callback that configures a namespace as an [`Initializer`].
///
/// Running it against a value entity fails with
/// [`FactoryError::Unsupported`].
pub fn on_namespace<F>(f: F) -> NamespaceInitializer<F>
where
    F: Fn(&Arc<Namespace>) -> LazyspaceResult<()> + Send + Sync,
{
    NamespaceInitializer { f }
}
