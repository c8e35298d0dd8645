//! # lazyspace
//!
//! **lazyspace** provides namespaces that build their contents on demand.
//! Referencing a name a namespace does not contain runs an ordered chain of
//! registered factories, then an ordered chain of initializers, and records
//! what was created so it can later be torn down and rebuilt.
//!
//! ## Overview
//!
//! - **Factories** are alternatives. They are tried most recently registered
//!   first; the first one after which the name is bound wins.
//! - **Initializers** are cumulative. All of them run against the new entity
//!   in registration order.
//! - **Wildcard** registrations apply to every name. A name's own factories
//!   are tried before the wildcard ones; wildcard initializers run before
//!   the name's own.
//! - **Reload** unbinds everything the registry created while keeping the
//!   chains, so the next reference builds it again.
//!
//! Created namespaces usually attach a registry of their own, so the same
//! protocol composes recursively (`App::Models::User`).
//!
//! ## Quick Start
//!
//! ```rust
//! use lazyspace::prelude::*;
//!
//! let app = Namespace::new("App");
//! let registry = app.attach_registry();
//!
//! // Every missing name under App becomes a namespace...
//! registry.add_factory(Key::Wildcard, CreateNamespace::new());
//!
//! // ...and `Models` gets typed containers for its own missing names.
//! registry
//!     .add_initializer(
//!         "models",
//!         on_namespace(|models| {
//!             models.attach_registry().add_factory(Key::Wildcard, CreateTyped::new());
//!             Ok(())
//!         }),
//!     )
//!     .unwrap();
//!
//! let user = app.lookup("Models::User").unwrap();
//! assert!(user.as_namespace().unwrap().is_typed());
//!
//! registry.reload().unwrap();
//! assert!(!app.contains("models"));
//! ```

mod config;
mod entity;
mod error;
mod factory;
mod loader;
mod namespace;
mod policy;
mod registry;
mod resolver;

pub mod events;
pub mod name;
pub mod prelude;

// Re-export core types
pub use config::{Config, LoadConfig, DEFAULT_EXTENSION};
pub use entity::Entity;
pub use error::{FactoryError, LazyspaceError, LazyspaceResult};
pub use events::{EventSender, EventStream, RegistryEvent, StreamBuilder};
pub use factory::{on_namespace, Factory, Initializer, NamespaceInitializer};
pub use loader::{LoadFromFiles, ManifestEvaluator, SourceEvaluator, SourceFile};
pub use name::{CanonicalName, Key};
pub use namespace::{Namespace, NamespaceKind, SEPARATOR};
pub use policy::{BaseRef, Configure, CreateNamespace, CreateTyped};
pub use registry::Registry;
