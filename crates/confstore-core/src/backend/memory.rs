//! In-process backend keeping rows in a vector
//!
//! Useful for tests and for hosts that want the store semantics without a
//! database file. Writes can be switched to fail, which lets callers observe
//! how the cache behaves when the backend rejects a write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{NewSetting, RowId, SettingRow, StorageBackend, CONFIG_TABLE};
use crate::error::BackendError;

#[derive(Debug, Default)]
struct Rows {
    next_id: RowId,
    rows: Vec<SettingRow>,
}

/// Vector-backed settings table
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Rows>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert and update fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all rows
    pub fn rows(&self) -> Result<Vec<SettingRow>, BackendError> {
        Ok(self.lock()?.rows.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows>, BackendError> {
        self.inner
            .lock()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))
    }

    fn check_table(table: &str) -> Result<(), BackendError> {
        if table == CONFIG_TABLE {
            Ok(())
        } else {
            Err(BackendError::Rejected(format!("no such table: {table}")))
        }
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BackendError::Rejected("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn fetch_all(&self, table: &str) -> Result<Vec<SettingRow>, BackendError> {
        Self::check_table(table)?;
        Ok(self.lock()?.rows.clone())
    }

    fn fetch_one(
        &self,
        table: &str,
        component: &str,
        name: &str,
    ) -> Result<Option<SettingRow>, BackendError> {
        Self::check_table(table)?;
        let inner = self.lock()?;
        Ok(inner
            .rows
            .iter()
            .find(|r| r.component == component && r.name == name)
            .cloned())
    }

    fn insert(&self, table: &str, row: &NewSetting) -> Result<RowId, BackendError> {
        Self::check_table(table)?;
        self.check_writable()?;
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(SettingRow {
            id,
            component: row.component.clone(),
            name: row.name.clone(),
            val: row.val.clone(),
        });
        Ok(id)
    }

    fn update_value(&self, table: &str, id: RowId, val: &str) -> Result<(), BackendError> {
        Self::check_table(table)?;
        self.check_writable()?;
        let mut inner = self.lock()?;
        if let Some(row) = inner.rows.iter_mut().find(|r| r.id == id) {
            row.val = val.to_string();
        }
        Ok(())
    }
}
