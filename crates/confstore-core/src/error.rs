//! Error types for the configuration store
//!
//! Only hard failures live here. A missing setting is answered with a
//! fallback and an undecodable stored value is read back as plain text, so
//! neither has a variant.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Persistence was requested but no backend is bound
    #[error("No storage backend bound to the config store")]
    NoBackend,

    /// The storage backend failed a fetch, insert or update
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value nests lists and maps deeper than the stored form can be read back
    #[error("Value nested {depth} levels deep, limit is {limit}")]
    NestingTooDeep { depth: usize, limit: usize },

    /// The settings file is malformed
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<ConfigError>,
    },
}

/// Errors raised by a [`StorageBackend`](crate::backend::StorageBackend)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Backend lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl ConfigError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the error came from the storage backend, looking through context
    pub fn is_backend(&self) -> bool {
        match self {
            Self::Backend(_) => true,
            Self::WithContext { source, .. } => source.is_backend(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for ConfigError {
    fn from(e: rusqlite::Error) -> Self {
        ConfigError::Backend(BackendError::Sqlite(e))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Settings(e.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Settings(e.to_string())
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<ConfigError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let err = ConfigError::NoBackend.context("Failed to persist core.theme");

        let msg = err.to_string();
        assert!(msg.contains("Failed to persist core.theme"));
        assert!(msg.contains("No storage backend"));
    }

    #[test]
    fn test_result_ext_on_backend_error() {
        let result: std::result::Result<(), BackendError> =
            Err(BackendError::Rejected("disk full".to_string()));
        let err = result.with_context(|| "INSERT config".to_string()).unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_no_backend_is_not_backend_failure() {
        assert!(!ConfigError::NoBackend.is_backend());
    }
}
