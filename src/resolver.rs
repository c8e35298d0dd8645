//! Resolution of missing names.
//!
//! Factories are alternatives: the wildcard chain and then the name's own
//! chain are walked backwards, so name-specific factories are tried before
//! wildcards and newer ones before older ones. The search stops at the first
//! factory after which the name is bound. Initializers are cumulative:
//! the wildcard chain runs first, then the name's own chain, each in
//! registration order.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::entity::Entity;
use crate::error::{LazyspaceError, LazyspaceResult};
use crate::events::RegistryEvent;
use crate::name::CanonicalName;
use crate::namespace::Namespace;
use crate::registry::RegistryState;

// =============================================================================
// Wait-for graph
// =============================================================================
//
// Every resolution in the process records which thread owns it, and every
// thread about to block on a per-name lock records what it waits for. A
// thread whose wait would lead back to itself through owners and waiters
// fails with `CircularResolution` instead of blocking. This covers a factory
// referencing its own name as well as cycles split across threads or
// namespaces.

/// One name in one registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Slot {
    registry: usize,
    name: CanonicalName,
}

impl Slot {
    fn new(state: &RegistryState, name: &CanonicalName) -> Self {
        Self {
            registry: registry_id(state),
            name: name.clone(),
        }
    }
}

#[derive(Default)]
struct WaitGraph {
    owners: HashMap<Slot, ThreadId>,
    waiting: HashMap<ThreadId, Slot>,
}

impl WaitGraph {
    /// Whether `me` waiting on `slot` would close a cycle.
    fn would_cycle(&self, slot: &Slot, me: ThreadId) -> bool {
        let mut owner = self.owners.get(slot).copied();
        // Each hop follows a distinct waiting thread.
        for _ in 0..=self.waiting.len() {
            match owner {
                Some(thread) if thread == me => return true,
                Some(thread) => {
                    owner = self
                        .waiting
                        .get(&thread)
                        .and_then(|next| self.owners.get(next))
                        .copied();
                }
                None => return false,
            }
        }
        false
    }
}

static WAITS: Lazy<Mutex<WaitGraph>> = Lazy::new(|| Mutex::new(WaitGraph::default()));

fn registry_id(state: &RegistryState) -> usize {
    state as *const RegistryState as usize
}

/// Whether the current thread is resolving any name in this registry.
pub(crate) fn resolving_on_current_thread(state: &RegistryState) -> bool {
    let id = registry_id(state);
    let me = thread::current().id();
    WAITS
        .lock()
        .owners
        .iter()
        .any(|(slot, thread)| slot.registry == id && *thread == me)
}

/// Marks a slot as owned by the current thread until dropped.
struct InFlight {
    slot: Slot,
}

impl InFlight {
    fn enter(slot: Slot) -> Self {
        let me = thread::current().id();
        let mut graph = WAITS.lock();
        graph.waiting.remove(&me);
        graph.owners.insert(slot.clone(), me);
        Self { slot }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        WAITS.lock().owners.remove(&self.slot);
    }
}

/// Resolve `name` in `namespace` through its registry.
pub(crate) fn resolve(
    namespace: &Arc<Namespace>,
    state: &RegistryState,
    name: &CanonicalName,
) -> LazyspaceResult<Entity> {
    // Recursive so nested resolutions on this namespace never wait behind a
    // queued reload.
    let _gate = state.gate.read_recursive();

    let me = thread::current().id();
    let slot = Slot::new(state, name);
    {
        let mut graph = WAITS.lock();
        if graph.would_cycle(&slot, me) {
            debug!(target: "lazyspace::resolve", namespace = %namespace.path(), %name, "Circular resolution");
            return Err(LazyspaceError::CircularResolution {
                namespace: namespace.path().to_string(),
                name: name.clone(),
            });
        }
        graph.waiting.insert(me, slot.clone());
    }

    let lock = state.name_lock(name);
    let _guard = lock.lock();
    let _in_flight = InFlight::enter(slot);

    // Another thread may have bound it while we waited.
    if let Some(entity) = namespace.get_canonical(name) {
        return Ok(entity);
    }

    let factories = state.factories.read().concatenated(name);
    trace!(
        target: "lazyspace::resolve",
        namespace = %namespace.path(),
        %name,
        candidates = factories.len(),
        "Resolving missing name"
    );

    let mut bound = None;
    for factory in factories.iter().rev() {
        factory.create(namespace, name)?;
        if let Some(entity) = namespace.get_canonical(name) {
            debug!(
                target: "lazyspace::resolve",
                namespace = %namespace.path(),
                %name,
                factory = factory.label(),
                "Name bound"
            );
            bound = Some(entity);
            break;
        }
    }

    let Some(entity) = bound else {
        debug!(target: "lazyspace::resolve", namespace = %namespace.path(), %name, "No factory bound name");
        state.emit(RegistryEvent::NotFound {
            namespace: namespace.path().to_string(),
            name: name.clone(),
        });
        return Err(LazyspaceError::NameNotFound {
            namespace: namespace.path().to_string(),
            name: name.clone(),
        });
    };

    let initializers = state.initializers.read().concatenated(name);
    for initializer in &initializers {
        trace!(
            target: "lazyspace::resolve",
            namespace = %namespace.path(),
            %name,
            initializer = initializer.label(),
            "Running initializer"
        );
        initializer.initialize(&entity)?;
    }

    {
        let mut loaded = state.loaded.lock();
        if !loaded.contains(name) {
            loaded.push(name.clone());
        }
    }

    state.emit(RegistryEvent::Bound {
        namespace: namespace.path().to_string(),
        name: name.clone(),
    });
    Ok(entity)
}
