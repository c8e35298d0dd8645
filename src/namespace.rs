//! Namespaces: containers of named entities that can resolve missing names.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

use crate::entity::Entity;
use crate::error::{LazyspaceError, LazyspaceResult};
use crate::name::CanonicalName;
use crate::registry::{Registry, RegistryState};
use crate::resolver;

/// Path separator used by [`Namespace::lookup`] and display paths.
pub const SEPARATOR: &str = "::";

/// What sort of container a namespace is.
#[derive(Debug, Clone)]
pub enum NamespaceKind {
    /// A plain namespace.
    Module,
    /// A typed container. `None` means it derives directly from the root type.
    Typed { base: Option<Arc<Namespace>> },
}

#[derive(Default)]
struct Entries {
    map: HashMap<CanonicalName, Entity>,
    order: Vec<CanonicalName>,
}

/// A container of named entities with an optional attached [`Registry`].
///
/// Namespaces are shared as `Arc<Namespace>` and are safe to use from
/// several threads.
///
/// # Example
///
/// ```rust
/// use lazyspace::{Entity, Namespace};
///
/// let app = Namespace::new("App");
/// app.set("max_retries", Entity::value(3u32));
///
/// let retries = app.resolve("MaxRetries").unwrap();
/// assert_eq!(retries.downcast_ref::<u32>(), Some(&3));
/// assert!(app.resolve("missing").unwrap_err().is_not_found());
/// ```
pub struct Namespace {
    path: String,
    kind: NamespaceKind,
    entries: RwLock<Entries>,
    registry: OnceLock<Arc<RegistryState>>,
}

impl Namespace {
    /// Create an empty plain namespace.
    pub fn new(path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::with_kind(path.into(), NamespaceKind::Module))
    }

    /// Create an empty typed container deriving from `base`.
    pub fn typed(path: impl Into<String>, base: Option<Arc<Namespace>>) -> Arc<Self> {
        Arc::new(Self::with_kind(path.into(), NamespaceKind::Typed { base }))
    }

    fn with_kind(path: String, kind: NamespaceKind) -> Self {
        Self {
            path,
            kind,
            entries: RwLock::new(Entries::default()),
            registry: OnceLock::new(),
        }
    }

    /// The display path, e.g. `App::Models`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The display path a child bound under `name` would get.
    pub fn child_path(&self, name: &CanonicalName) -> String {
        format!("{}{}{}", self.path, SEPARATOR, name)
    }

    pub fn kind(&self) -> &NamespaceKind {
        &self.kind
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.kind, NamespaceKind::Typed { .. })
    }

    /// The direct base of a typed container.
    pub fn base(&self) -> Option<&Arc<Namespace>> {
        match &self.kind {
            NamespaceKind::Typed { base } => base.as_ref(),
            NamespaceKind::Module => None,
        }
    }

    /// Whether `other` is this namespace or one of its bases.
    pub fn is_a(&self, other: &Namespace) -> bool {
        let mut current = Some(self);
        while let Some(ns) = current {
            if std::ptr::eq(ns, other) {
                return true;
            }
            current = ns.base().map(|b| b.as_ref());
        }
        false
    }

    /// Get the entity bound to `name` without triggering resolution.
    pub fn get(&self, name: impl Into<CanonicalName>) -> Option<Entity> {
        self.get_canonical(&name.into())
    }

    pub(crate) fn get_canonical(&self, name: &CanonicalName) -> Option<Entity> {
        self.entries.read().map.get(name).cloned()
    }

    /// Check if `name` is bound, without triggering resolution.
    pub fn contains(&self, name: impl Into<CanonicalName>) -> bool {
        self.contains_canonical(&name.into())
    }

    pub(crate) fn contains_canonical(&self, name: &CanonicalName) -> bool {
        self.entries.read().map.contains_key(name)
    }

    /// Bind `name` directly, returning the previous binding.
    ///
    /// Direct bindings are not recorded as loaded and survive reload.
    pub fn set(&self, name: impl Into<CanonicalName>, entity: impl Into<Entity>) -> Option<Entity> {
        let name = name.into();
        let mut entries = self.entries.write();
        if !entries.map.contains_key(&name) {
            entries.order.push(name.clone());
        }
        entries.map.insert(name, entity.into())
    }

    /// Remove the binding for `name`.
    pub fn remove(&self, name: impl Into<CanonicalName>) -> Option<Entity> {
        self.remove_canonical(&name.into())
    }

    pub(crate) fn remove_canonical(&self, name: &CanonicalName) -> Option<Entity> {
        let mut entries = self.entries.write();
        entries.order.retain(|n| n != name);
        entries.map.remove(name)
    }

    /// Bound names in binding order.
    pub fn names(&self) -> Vec<CanonicalName> {
        self.entries.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().map.is_empty()
    }

    /// Attach a registry to this namespace.
    ///
    /// Attaching is idempotent: a second call returns a handle to the same
    /// chains and loaded set.
    pub fn attach_registry(self: &Arc<Self>) -> Registry {
        let state = self.registry.get_or_init(|| {
            trace!(target: "lazyspace::registry", namespace = %self.path, "Registry attached");
            Arc::new(RegistryState::new())
        });
        Registry::new(Arc::clone(self), Arc::clone(state))
    }

    /// The attached registry, if any.
    pub fn registry(self: &Arc<Self>) -> Option<Registry> {
        self.registry
            .get()
            .map(|state| Registry::new(Arc::clone(self), Arc::clone(state)))
    }

    pub fn has_registry(&self) -> bool {
        self.registry.get().is_some()
    }

    /// Reference a name, resolving it through the registry if it is missing.
    ///
    /// Bound names are returned as-is. A missing name runs the attached
    /// registry's factory and initializer chains; without a registry, or
    /// when no factory binds it, this fails with
    /// [`LazyspaceError::NameNotFound`].
    pub fn resolve(self: &Arc<Self>, name: impl Into<CanonicalName>) -> LazyspaceResult<Entity> {
        let name = name.into();
        if let Some(entity) = self.get_canonical(&name) {
            return Ok(entity);
        }
        match self.registry.get() {
            Some(state) => resolver::resolve(self, state, &name),
            None => Err(LazyspaceError::NameNotFound {
                namespace: self.path.clone(),
                name,
            }),
        }
    }

    /// Like [`resolve`](Self::resolve), but requires a namespace.
    pub fn resolve_namespace(
        self: &Arc<Self>,
        name: impl Into<CanonicalName>,
    ) -> LazyspaceResult<Arc<Namespace>> {
        let name = name.into();
        match self.resolve(&name)? {
            Entity::Namespace(ns) => Ok(ns),
            Entity::Value(_) => Err(LazyspaceError::NotANamespace {
                namespace: self.path.clone(),
                name,
            }),
        }
    }

    /// Resolve a `::` separated path relative to this namespace.
    ///
    /// Every segment but the last must resolve to a namespace.
    pub fn lookup(self: &Arc<Self>, path: &str) -> LazyspaceResult<Entity> {
        let mut segments = path.split(SEPARATOR).filter(|s| !s.is_empty()).peekable();
        let mut current = Arc::clone(self);
        let mut entity = Entity::Namespace(Arc::clone(self));
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                current = current.resolve_namespace(segment)?;
            } else {
                entity = current.resolve(segment)?;
            }
        }
        Ok(entity)
    }

    /// Copy this namespace under a new path.
    ///
    /// The copy shares the bound entities and starts with the same factory
    /// and initializer chains, but with an empty loaded set.
    pub fn duplicate(&self, path: impl Into<String>) -> Arc<Namespace> {
        let copy = Self::with_kind(path.into(), self.kind.clone());
        {
            let source = self.entries.read();
            let mut target = copy.entries.write();
            target.map = source.map.clone();
            target.order = source.order.clone();
        }
        if let Some(state) = self.registry.get() {
            // The cell is fresh, so this cannot fail.
            let _ = copy.registry.set(Arc::new(state.fork()));
        }
        Arc::new(copy)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.path)
            .field("typed", &self.is_typed())
            .field("names", &self.names())
            .field("registry", &self.has_registry())
            .finish()
    }
}
