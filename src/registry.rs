//! Per-namespace bookkeeping for lazy resolution.
//!
//! A [`Registry`] holds the factory chains, initializer chains and the record
//! of names it materialized. It is attached to a namespace with
//! [`Namespace::attach_registry`] and consulted whenever that namespace is
//! asked for a name it does not contain.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::error::{LazyspaceError, LazyspaceResult};
use crate::events::{EventSender, EventStream, RegistryEvent, StreamBuilder};
use crate::factory::{Factory, Initializer};
use crate::name::{CanonicalName, Key};
use crate::namespace::Namespace;
use crate::resolver;

/// Ordered callback chains: one wildcard chain plus one chain per name.
///
/// Chains are append-only and keep registration order.
pub(crate) struct Chains<T: ?Sized> {
    wildcard: Vec<Arc<T>>,
    named: HashMap<CanonicalName, Vec<Arc<T>>>,
}

impl<T: ?Sized> Chains<T> {
    fn new() -> Self {
        Self {
            wildcard: Vec::new(),
            named: HashMap::new(),
        }
    }

    fn push(&mut self, key: Key, item: Arc<T>) {
        match key {
            Key::Wildcard => self.wildcard.push(item),
            Key::Name(name) => self.named.entry(name).or_default().push(item),
        }
    }

    /// Wildcard chain followed by the chain for `name`.
    pub(crate) fn concatenated(&self, name: &CanonicalName) -> Vec<Arc<T>> {
        let named = self.named.get(name).map(Vec::as_slice).unwrap_or_default();
        self.wildcard.iter().chain(named).cloned().collect()
    }

    fn count(&self, key: &Key) -> usize {
        match key {
            Key::Wildcard => self.wildcard.len(),
            Key::Name(name) => self.named.get(name).map_or(0, Vec::len),
        }
    }
}

impl<T: ?Sized> Clone for Chains<T> {
    fn clone(&self) -> Self {
        Self {
            wildcard: self.wildcard.clone(),
            named: self.named.clone(),
        }
    }
}

/// Registry state owned by a namespace.
pub(crate) struct RegistryState {
    pub(crate) factories: RwLock<Chains<dyn Factory>>,
    pub(crate) initializers: RwLock<Chains<dyn Initializer>>,
    pub(crate) loaded: Mutex<Vec<CanonicalName>>,
    /// Resolutions hold this shared; reload holds it exclusively.
    pub(crate) gate: RwLock<()>,
    name_locks: Mutex<HashMap<CanonicalName, Arc<Mutex<()>>>>,
    subscribers: Mutex<Vec<EventSender<RegistryEvent>>>,
}

impl RegistryState {
    pub(crate) fn new() -> Self {
        Self::with_chains(Chains::new(), Chains::new())
    }

    fn with_chains(
        factories: Chains<dyn Factory>,
        initializers: Chains<dyn Initializer>,
    ) -> Self {
        Self {
            factories: RwLock::new(factories),
            initializers: RwLock::new(initializers),
            loaded: Mutex::new(Vec::new()),
            gate: RwLock::new(()),
            name_locks: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// A fresh state starting from the same chains.
    pub(crate) fn fork(&self) -> Self {
        Self::with_chains(self.factories.read().clone(), self.initializers.read().clone())
    }

    /// The lock serializing resolutions of `name`.
    pub(crate) fn name_lock(&self, name: &CanonicalName) -> Arc<Mutex<()>> {
        Arc::clone(self.name_locks.lock().entry(name.clone()).or_default())
    }

    pub(crate) fn add_subscriber(&self, sender: EventSender<RegistryEvent>) {
        self.subscribers.lock().push(sender);
    }

    /// Deliver `event` to every live subscriber without blocking.
    pub(crate) fn emit(&self, event: RegistryEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.is_closed());
        for sender in subscribers.iter() {
            if sender.try_send(event.clone()).is_err() {
                warn!(target: "lazyspace::registry", ?event, "Subscriber buffer full, event dropped");
            }
        }
    }
}

/// Handle to the registry attached to a namespace.
///
/// Handles are cheap to clone; all clones share the namespace's state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use lazyspace::{CanonicalName, Entity, Key, LazyspaceResult, Namespace};
///
/// let app = Namespace::new("App");
/// let registry = app.attach_registry();
/// registry.add_factory(Key::Wildcard, |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
///     ns.set(name, Entity::value(name.path_form()));
///     Ok(())
/// });
///
/// let entity = app.resolve("user_account").unwrap();
/// assert_eq!(entity.downcast_ref::<String>().unwrap(), "user_account");
/// assert_eq!(registry.loaded_names(), vec![CanonicalName::new("UserAccount")]);
/// ```
#[derive(Clone)]
pub struct Registry {
    namespace: Arc<Namespace>,
    state: Arc<RegistryState>,
}

impl Registry {
    pub(crate) fn new(namespace: Arc<Namespace>, state: Arc<RegistryState>) -> Self {
        Self { namespace, state }
    }

    /// The namespace this registry is attached to.
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Append a factory to the chain for `key`.
    ///
    /// On resolution, the name-specific chain is tried before the wildcard
    /// chain, each most recently registered first.
    pub fn add_factory(&self, key: impl Into<Key>, factory: impl Factory + 'static) {
        let key = key.into();
        trace!(
            target: "lazyspace::registry",
            namespace = %self.namespace.path(),
            %key,
            factory = factory.label(),
            "Factory registered"
        );
        self.state.factories.write().push(key, Arc::new(factory));
    }

    /// Append an initializer to the chain for `key`.
    ///
    /// If `key` names something already bound in the namespace, the
    /// initializer runs against it right away instead of being queued, and
    /// its result is returned.
    pub fn add_initializer(
        &self,
        key: impl Into<Key>,
        initializer: impl Initializer + 'static,
    ) -> LazyspaceResult<()> {
        let key = key.into();
        if let Key::Name(name) = &key {
            if let Some(entity) = self.namespace.get_canonical(name) {
                trace!(
                    target: "lazyspace::registry",
                    namespace = %self.namespace.path(),
                    %name,
                    "Running initializer against existing binding"
                );
                return initializer.initialize(&entity);
            }
        }
        trace!(
            target: "lazyspace::registry",
            namespace = %self.namespace.path(),
            %key,
            initializer = initializer.label(),
            "Initializer registered"
        );
        self.state.initializers.write().push(key, Arc::new(initializer));
        Ok(())
    }

    /// Names bound through resolution, in binding order.
    pub fn loaded_names(&self) -> Vec<CanonicalName> {
        self.state.loaded.lock().clone()
    }

    /// Unbind every name this registry loaded.
    ///
    /// Chains are kept, so the next reference to a removed name resolves it
    /// again from scratch. Names that are no longer bound are skipped.
    /// Returns the names that were torn down.
    pub fn reload(&self) -> LazyspaceResult<Vec<CanonicalName>> {
        if resolver::resolving_on_current_thread(&self.state) {
            return Err(LazyspaceError::ReloadDuringResolution {
                namespace: self.namespace.path().to_string(),
            });
        }

        let _gate = self.state.gate.write();
        let names = std::mem::take(&mut *self.state.loaded.lock());
        for name in &names {
            if self.namespace.remove_canonical(name).is_none() {
                trace!(
                    target: "lazyspace::registry",
                    namespace = %self.namespace.path(),
                    %name,
                    "Loaded name already unbound"
                );
            }
        }

        debug!(
            target: "lazyspace::registry",
            namespace = %self.namespace.path(),
            count = names.len(),
            "Registry reloaded"
        );
        self.state.emit(RegistryEvent::Reloaded {
            namespace: self.namespace.path().to_string(),
            names: names.clone(),
        });
        Ok(names)
    }

    /// Number of factories registered under exactly `key`.
    pub fn factory_count(&self, key: impl Into<Key>) -> usize {
        self.state.factories.read().count(&key.into())
    }

    /// Number of queued initializers under exactly `key`.
    pub fn initializer_count(&self, key: impl Into<Key>) -> usize {
        self.state.initializers.read().count(&key.into())
    }

    /// Subscribe to this registry's events.
    ///
    /// Events are delivered without blocking resolution; when the buffer is
    /// full further events are dropped until the subscriber catches up.
    pub fn subscribe(&self, buffer_size: usize) -> EventStream<RegistryEvent> {
        let (sender, stream) = StreamBuilder::new().buffer_size(buffer_size).build();
        self.state.add_subscriber(sender);
        stream
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace.path())
            .field("loaded", &self.loaded_names())
            .finish()
    }
}
