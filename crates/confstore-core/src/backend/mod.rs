//! Storage backends for the configuration store
//!
//! The store only needs four row operations from durable storage, captured by
//! [`StorageBackend`]. Two implementations ship with the crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ConfigStore                  │
//! ├──────────────────────────────────────────────┤
//! │   fetch_all │ fetch_one │ insert │ update    │
//! └──────────────────────────────────────────────┘
//!        ↓                         ↓
//!   SqliteBackend             MemoryBackend
//!   (table `config`, WAL)     (Vec<SettingRow>)
//! ```
//!
//! Neither enforces uniqueness of `(component, name)`; the store queries
//! before it inserts.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::BackendError;
use serde::{Deserialize, Serialize};

/// Name of the settings table
pub const CONFIG_TABLE: &str = "config";

/// Backend-assigned row identifier
pub type RowId = i64;

/// A persisted setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRow {
    pub id: RowId,
    pub component: String,
    pub name: String,
    /// Encoded value
    pub val: String,
}

/// Insert payload; the id is assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSetting {
    pub component: String,
    pub name: String,
    pub val: String,
}

impl NewSetting {
    pub fn new(component: impl Into<String>, name: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            val: val.into(),
        }
    }
}

/// Record operations the store requires from durable storage
///
/// Every call is a blocking round-trip. Implementations must be shareable
/// across threads; interior locking is their concern.
pub trait StorageBackend: Send + Sync {
    /// All rows of `table`, in insertion order
    fn fetch_all(&self, table: &str) -> Result<Vec<SettingRow>, BackendError>;

    /// The row for `(component, name)`, if any
    fn fetch_one(
        &self,
        table: &str,
        component: &str,
        name: &str,
    ) -> Result<Option<SettingRow>, BackendError>;

    /// Insert a row and return its id
    fn insert(&self, table: &str, row: &NewSetting) -> Result<RowId, BackendError>;

    /// Replace the encoded value of row `id`
    fn update_value(&self, table: &str, id: RowId, val: &str) -> Result<(), BackendError>;
}
