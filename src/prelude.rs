//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use lazyspace::prelude::*;
//! ```

// Namespaces and registries
pub use crate::entity::Entity;
pub use crate::name::{CanonicalName, Key};
pub use crate::namespace::{Namespace, NamespaceKind};
pub use crate::registry::Registry;

// Callbacks and policies
pub use crate::factory::{on_namespace, Factory, Initializer};
pub use crate::loader::{LoadFromFiles, ManifestEvaluator, SourceEvaluator, SourceFile};
pub use crate::policy::{BaseRef, CreateNamespace, CreateTyped};

// Configuration
pub use crate::config::{Config, LoadConfig};

// Events
pub use crate::events::{EventStream, RegistryEvent};

// Errors
pub use crate::error::{FactoryError, LazyspaceError, LazyspaceResult};
