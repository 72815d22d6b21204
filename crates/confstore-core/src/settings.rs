//! Store settings, read from a TOML file
//!
//! ```toml
//! database = "var/confstore.db"
//! busy_timeout_ms = 5000
//! journal_mode = "wal"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Default database file
pub const DEFAULT_DATABASE: &str = "confstore.db";

/// Default SQLite busy timeout in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How the SQLite backend opens its database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the SQLite database file
    pub database: PathBuf,

    /// How long a writer waits on a locked database
    pub busy_timeout_ms: u64,

    /// SQLite journal mode
    pub journal_mode: JournalMode,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
        }
    }
}

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log: readers do not block the writer
    #[default]
    Wal,
    /// Rollback journal
    Delete,
}

impl StoreSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Set the busy timeout
    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Set the journal mode
    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading settings '{}'", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Parsing settings '{}'", path.display()))?;
        Ok(settings)
    }

    /// Save settings to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
