//! Error types for lazyspace.

use std::path::PathBuf;

use thiserror::Error;

use crate::name::CanonicalName;

/// Root error type for lazyspace operations.
#[derive(Error, Debug)]
pub enum LazyspaceError {
    /// No factory bound the requested name
    #[error("Name not found: {namespace}::{name}")]
    NameNotFound {
        namespace: String,
        name: CanonicalName,
    },

    /// A factory or initializer callback failed
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    /// A source file was found but could not be loaded
    #[error("Failed to load {}: {reason}", .path.display())]
    FileLoad { path: PathBuf, reason: String },

    /// Reading a source file exceeded the configured timeout
    #[error("Loading {} timed out after {timeout_ms}ms", .path.display())]
    LoadTimeout { path: PathBuf, timeout_ms: u64 },

    /// The name is bound, but not to a namespace
    #[error("{namespace}::{name} is not a namespace")]
    NotANamespace {
        namespace: String,
        name: CanonicalName,
    },

    /// A typed container was asked to derive from something that is not a type
    #[error("{namespace}::{name} cannot be used as a base type")]
    InvalidBase {
        namespace: String,
        name: CanonicalName,
    },

    /// A factory referenced the name it is currently creating
    #[error("Circular resolution of {namespace}::{name}")]
    CircularResolution {
        namespace: String,
        name: CanonicalName,
    },

    /// Reload was requested from inside a resolution on the same namespace
    #[error("Cannot reload {namespace} while one of its names is being resolved")]
    ReloadDuringResolution { namespace: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LazyspaceError {
    /// Returns `true` for the "name truly does not exist" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LazyspaceError::NameNotFound { .. })
    }
}

/// Failures raised by user-supplied factories and initializers.
#[derive(Error, Debug, Clone)]
pub enum FactoryError {
    /// Callback execution failed
    #[error("{0}")]
    Failed(String),

    /// The callback does not handle the entity it was given
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// IO error inside a callback
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FactoryError {
    fn from(err: std::io::Error) -> Self {
        FactoryError::Io(err.to_string())
    }
}

impl From<String> for FactoryError {
    fn from(msg: String) -> Self {
        FactoryError::Failed(msg)
    }
}

impl From<&str> for FactoryError {
    fn from(msg: &str) -> Self {
        FactoryError::Failed(msg.to_string())
    }
}

impl From<String> for LazyspaceError {
    fn from(msg: String) -> Self {
        LazyspaceError::Factory(FactoryError::Failed(msg))
    }
}

impl From<&str> for LazyspaceError {
    fn from(msg: &str) -> Self {
        LazyspaceError::Factory(FactoryError::Failed(msg.to_string()))
    }
}

/// Result type alias for general lazyspace operations.
pub type LazyspaceResult<T> = Result<T, LazyspaceError>;
