//! File-sourced definitions.
//!
//! [`LoadFromFiles`] is a factory that looks for a source file named after
//! the requested name (`UserAccount` → `user_account.ns`) in an ordered list
//! of directories and hands the first match to a [`SourceEvaluator`]. When no
//! directory holds such a file it binds nothing, so resolution moves on to
//! the next factory or fails with `NameNotFound`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use tracing::{debug, trace};

use crate::config::{Config, LoadConfig};
use crate::entity::Entity;
use crate::error::{LazyspaceError, LazyspaceResult};
use crate::factory::Factory;
use crate::name::CanonicalName;
use crate::namespace::Namespace;

/// A source file that was found for a name.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// Turns the text of a source file into bindings.
///
/// The evaluator is expected to bind `name` in `namespace`; if it does not,
/// resolution continues with the next factory.
pub trait SourceEvaluator: Send + Sync {
    fn evaluate(
        &self,
        namespace: &Arc<Namespace>,
        name: &CanonicalName,
        source: &SourceFile,
    ) -> LazyspaceResult<()>;
}

impl<F> SourceEvaluator for F
where
    F: Fn(&Arc<Namespace>, &CanonicalName, &SourceFile) -> LazyspaceResult<()> + Send + Sync,
{
    fn evaluate(
        &self,
        namespace: &Arc<Namespace>,
        name: &CanonicalName,
        source: &SourceFile,
    ) -> LazyspaceResult<()> {
        self(namespace, name, source)
    }
}

/// Evaluates manifest files into a namespace of string values.
///
/// Each non-blank line that does not start with `#` must have the form
/// `Name = value`. Names are normalized; values are trimmed and may be
/// wrapped in double quotes.
///
/// ```text
/// # user_account.ns
/// table = "users"
/// primary_key = id
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestEvaluator;

impl ManifestEvaluator {
    /// Parse manifest text into `(name, value)` pairs.
    pub fn parse(path: &Path, text: &str) -> LazyspaceResult<Vec<(CanonicalName, String)>> {
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed = line
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, _)| !key.is_empty());
            let Some((key, value)) = parsed else {
                return Err(LazyspaceError::FileLoad {
                    path: path.to_path_buf(),
                    reason: format!("line {}: expected `Name = value`", index + 1),
                });
            };
            entries.push((CanonicalName::new(key), unquote(value).to_string()));
        }
        Ok(entries)
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

impl SourceEvaluator for ManifestEvaluator {
    fn evaluate(
        &self,
        namespace: &Arc<Namespace>,
        name: &CanonicalName,
        source: &SourceFile,
    ) -> LazyspaceResult<()> {
        let entries = Self::parse(&source.path, &source.text)?;
        let child = Namespace::new(namespace.child_path(name));
        for (key, value) in entries {
            child.set(key, Entity::value(value));
        }
        namespace.set(name, child);
        Ok(())
    }
}

/// Factory that loads definitions from source files.
///
/// # Example
///
/// ```rust,no_run
/// use lazyspace::{Key, LoadConfig, LoadFromFiles, Namespace};
///
/// let app = Namespace::new("App");
/// let loader = LoadFromFiles::manifests(
///     LoadConfig::new().with_directories(["config/local", "config/default"]),
/// )
/// .unwrap();
/// app.attach_registry().add_factory(Key::Wildcard, loader);
///
/// // Reads config/local/database.ns or config/default/database.ns.
/// let database = app.resolve_namespace("database").unwrap();
/// ```
#[derive(Clone)]
pub struct LoadFromFiles {
    config: LoadConfig,
    evaluator: Arc<dyn SourceEvaluator>,
}

impl LoadFromFiles {
    /// Create a loader, validating `config`.
    pub fn new(config: LoadConfig, evaluator: impl SourceEvaluator + 'static) -> LazyspaceResult<Self> {
        config.validate().map_err(LazyspaceError::InvalidConfig)?;
        Ok(Self {
            config,
            evaluator: Arc::new(evaluator),
        })
    }

    /// Create a loader that evaluates files with [`ManifestEvaluator`].
    pub fn manifests(config: LoadConfig) -> LazyspaceResult<Self> {
        Self::new(config, ManifestEvaluator)
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The first existing candidate file for `name`, probing directories in
    /// order. Directories that happen to carry the file name are skipped.
    pub fn locate(&self, name: &CanonicalName) -> Option<PathBuf> {
        let file_name = self.config.file_name(&name.path_form());
        self.config
            .directories
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| fs::metadata(path).is_ok_and(|meta| !meta.is_dir()))
    }

    fn read(&self, path: &Path) -> LazyspaceResult<String> {
        let file_load = |err: std::io::Error| LazyspaceError::FileLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        };

        let Some(timeout) = self.config.timeout() else {
            return fs::read_to_string(path).map_err(file_load);
        };

        let (tx, rx) = mpsc::channel();
        let owned = path.to_path_buf();
        thread::spawn(move || {
            // The receiver is gone if we already timed out.
            let _ = tx.send(fs::read_to_string(&owned));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(file_load),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(LazyspaceError::LoadTimeout {
                path: path.to_path_buf(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(LazyspaceError::FileLoad {
                path: path.to_path_buf(),
                reason: "reader thread exited".to_string(),
            }),
        }
    }
}

impl Factory for LoadFromFiles {
    fn create(&self, namespace: &Arc<Namespace>, name: &CanonicalName) -> LazyspaceResult<()> {
        let Some(path) = self.locate(name) else {
            trace!(
                target: "lazyspace::load",
                namespace = %namespace.path(),
                %name,
                config = self.config.name(),
                "No source file"
            );
            return Ok(());
        };

        debug!(
            target: "lazyspace::load",
            namespace = %namespace.path(),
            %name,
            path = %path.display(),
            "Loading source file"
        );
        let text = self.read(&path)?;
        self.evaluator
            .evaluate(namespace, name, &SourceFile { path, text })
    }

    fn label(&self) -> &str {
        "file"
    }
}

impl std::fmt::Debug for LoadFromFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadFromFiles")
            .field("config", &self.config)
            .finish()
    }
}
