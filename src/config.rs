//! Configuration traits and the file loading configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default file extension for file-sourced definitions.
pub const DEFAULT_EXTENSION: &str = "ns";

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use lazyspace::Config;
/// use std::time::Duration;
///
/// #[derive(Debug, Clone)]
/// struct PollConfig {
///     interval_ms: u64,
/// }
///
/// impl Config for PollConfig {
///     fn name(&self) -> &str {
///         "poll"
///     }
///
///     fn timeout(&self) -> Option<Duration> {
///         Some(Duration::from_millis(self.interval_ms))
///     }
/// }
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Returns the timeout duration, if configured.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Validates the configuration.
    ///
    /// Returns Ok(()) if valid, or an error message describing the issue.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Where and how file-sourced definitions are found.
///
/// Directories are probed in order; the first one holding
/// `<path form of the name>.<extension>` wins.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Configuration name
    pub name: String,
    /// Directories to probe, in order
    pub directories: Vec<PathBuf>,
    /// File extension, without the dot
    pub extension: String,
    /// Upper bound on reading one file, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            directories: vec![PathBuf::from(".")],
            extension: DEFAULT_EXTENSION.to_string(),
            timeout_ms: None,
        }
    }
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the directory list.
    pub fn with_directories<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.directories = directories.into_iter().map(Into::into).collect();
        self
    }

    /// Set the file extension. A leading dot is ignored.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Set the read timeout in milliseconds.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Set the read timeout.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout_ms = Some(duration.as_millis() as u64);
        self
    }

    /// File name for a path-form stem, e.g. `user_account.ns`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension)
    }
}

impl Config for LoadConfig {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            "default"
        } else {
            &self.name
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), String> {
        if self.directories.is_empty() {
            return Err("at least one directory is required".to_string());
        }
        if self.extension.is_empty() {
            return Err("extension must not be empty".to_string());
        }
        if self.timeout_ms == Some(0) {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
