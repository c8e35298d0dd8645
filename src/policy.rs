//! Factories that create nested namespaces.
//!
//! Both policies attach a registry to what they create, so the new namespace
//! can lazily resolve its own names in turn.

use std::fmt;
use std::sync::Arc;

use crate::error::{LazyspaceError, LazyspaceResult};
use crate::factory::Factory;
use crate::name::CanonicalName;
use crate::namespace::{Namespace, SEPARATOR};

/// Callback run against a freshly created namespace before it is bound.
pub type Configure = Arc<dyn Fn(&Arc<Namespace>) -> LazyspaceResult<()> + Send + Sync>;

/// Creates a plain namespace for any name it is asked for.
///
/// # Example
///
/// ```rust
/// use lazyspace::{CreateNamespace, Key, Namespace};
///
/// let app = Namespace::new("App");
/// app.attach_registry().add_factory(Key::Wildcard, CreateNamespace::new());
///
/// let models = app.resolve_namespace("models").unwrap();
/// assert_eq!(models.path(), "App::Models");
/// assert!(models.has_registry());
/// ```
#[derive(Clone, Default)]
pub struct CreateNamespace {
    template: Option<Arc<Namespace>>,
    configure: Option<Configure>,
}

impl CreateNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every created namespace as a copy of `template`.
    pub fn from_template(mut self, template: Arc<Namespace>) -> Self {
        self.template = Some(template);
        self
    }

    /// Run `configure` against every created namespace before binding it.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&Arc<Namespace>) -> LazyspaceResult<()> + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }
}

impl Factory for CreateNamespace {
    fn create(&self, namespace: &Arc<Namespace>, name: &CanonicalName) -> LazyspaceResult<()> {
        let path = namespace.child_path(name);
        let child = match &self.template {
            Some(template) => template.duplicate(path),
            None => Namespace::new(path),
        };
        child.attach_registry();
        if let Some(configure) = &self.configure {
            configure(&child)?;
        }
        namespace.set(name, child);
        Ok(())
    }

    fn label(&self) -> &str {
        "namespace"
    }
}

impl fmt::Debug for CreateNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateNamespace")
            .field("template", &self.template.as_ref().map(|t| t.path().to_string()))
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// The base a typed container derives from.
#[derive(Debug, Clone, Default)]
pub enum BaseRef {
    /// The implicit root type.
    #[default]
    Root,
    /// A name resolved in the hosting namespace when the factory runs.
    Named(CanonicalName),
    /// A concrete typed namespace.
    Namespace(Arc<Namespace>),
}

/// Creates typed containers deriving from a common base.
///
/// A named base is resolved in the namespace the factory is registered on,
/// which may itself trigger lazy resolution.
///
/// # Example
///
/// ```rust
/// use lazyspace::{CreateTyped, Key, Namespace};
///
/// let app = Namespace::new("App");
/// app.set("record", Namespace::typed("App::Record", None));
/// app.attach_registry()
///     .add_factory(Key::Wildcard, CreateTyped::deriving_from("record"));
///
/// let user = app.resolve_namespace("user").unwrap();
/// let record = app.resolve_namespace("record").unwrap();
/// assert!(user.is_a(&record));
/// ```
#[derive(Clone, Default)]
pub struct CreateTyped {
    base: BaseRef,
    configure: Option<Configure>,
}

impl CreateTyped {
    /// Typed containers deriving from the root type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed containers deriving from the namespace bound to `name`.
    pub fn deriving_from(name: impl Into<CanonicalName>) -> Self {
        Self {
            base: BaseRef::Named(name.into()),
            configure: None,
        }
    }

    /// Typed containers deriving from `base`.
    pub fn deriving(base: Arc<Namespace>) -> Self {
        Self {
            base: BaseRef::Namespace(base),
            configure: None,
        }
    }

    /// Run `configure` against every created container before binding it.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&Arc<Namespace>) -> LazyspaceResult<()> + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    pub fn base(&self) -> &BaseRef {
        &self.base
    }

    fn resolve_base(&self, namespace: &Arc<Namespace>) -> LazyspaceResult<Option<Arc<Namespace>>> {
        let base = match &self.base {
            BaseRef::Root => return Ok(None),
            BaseRef::Named(name) => match namespace.resolve_namespace(name) {
                Ok(base) => base,
                Err(LazyspaceError::NotANamespace { namespace, name }) => {
                    return Err(LazyspaceError::InvalidBase { namespace, name });
                }
                Err(err) => return Err(err),
            },
            BaseRef::Namespace(base) => Arc::clone(base),
        };

        if !base.is_typed() {
            let (parent, last) = base
                .path()
                .rsplit_once(SEPARATOR)
                .unwrap_or(("", base.path()));
            return Err(LazyspaceError::InvalidBase {
                namespace: parent.to_string(),
                name: CanonicalName::new(last),
            });
        }
        Ok(Some(base))
    }
}

impl Factory for CreateTyped {
    fn create(&self, namespace: &Arc<Namespace>, name: &CanonicalName) -> LazyspaceResult<()> {
        let base = self.resolve_base(namespace)?;
        let child = Namespace::typed(namespace.child_path(name), base);
        child.attach_registry();
        if let Some(configure) = &self.configure {
            configure(&child)?;
        }
        namespace.set(name, child);
        Ok(())
    }

    fn label(&self) -> &str {
        "typed"
    }
}

impl fmt::Debug for CreateTyped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateTyped")
            .field("base", &self.base)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}
