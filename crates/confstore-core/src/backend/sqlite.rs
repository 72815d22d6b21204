//! SqliteBackend — SQLite persistence for the `config` table
//!
//! One connection guarded by a mutex. The schema is created idempotently on
//! open. `(component, name)` carries a lookup index but no UNIQUE constraint;
//! the store queries before it inserts.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{NewSetting, RowId, SettingRow, StorageBackend, CONFIG_TABLE};
use crate::error::{BackendError, Result, ResultExt};
use crate::settings::{JournalMode, StoreSettings};

/// SQLite-backed settings table
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Opens (or creates) the database at `path` with default settings.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use confstore_core::backend::SqliteBackend;
    /// let backend = SqliteBackend::open("confstore.db").unwrap();
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let settings = StoreSettings::default().with_database(path.as_ref());
        Self::open_with(&settings)
    }

    /// Opens the database described by `settings`
    pub fn open_with(settings: &StoreSettings) -> Result<Self> {
        let path = settings.database.as_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Creating database directory '{}'", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Opening SQLite '{}'", path.display()))?;
        Self::configure(conn, settings)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory SQLite")?;
        Self::configure(conn, &StoreSettings::default())
    }

    fn configure(conn: Connection, settings: &StoreSettings) -> Result<Self> {
        conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
            .context("Setting SQLite busy timeout")?;

        // journal_mode returns a row, so it cannot go through execute_batch
        let mode = match settings.journal_mode {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        };
        let _: String = conn
            .query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))
            .context("Setting SQLite journal mode")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")
            .context("Configuring SQLite PRAGMA")?;

        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.migrate()?;
        tracing::debug!("SQLite config backend ready ({:?} journal)", settings.journal_mode);
        Ok(backend)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS config (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                component  TEXT NOT NULL,
                name       TEXT NOT NULL,
                val        TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_config_component_name
                ON config(component, name);
            ",
        )
        .context("Migrating config schema")?;
        Ok(())
    }

    /// Number of rows in the settings table
    pub fn row_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn
            .lock()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn checked_table(table: &str) -> std::result::Result<&str, BackendError> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(table)
    } else {
        Err(BackendError::Rejected(format!("invalid table name '{table}'")))
    }
}

fn row_to_setting(row: &rusqlite::Row<'_>) -> rusqlite::Result<SettingRow> {
    Ok(SettingRow {
        id: row.get(0)?,
        component: row.get(1)?,
        name: row.get(2)?,
        val: row.get(3)?,
    })
}

impl StorageBackend for SqliteBackend {
    fn fetch_all(&self, table: &str) -> std::result::Result<Vec<SettingRow>, BackendError> {
        let table = checked_table(table)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, component, name, val FROM {table} ORDER BY id"
        ))?;
        let rows = stmt.query_map([], row_to_setting)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn fetch_one(
        &self,
        table: &str,
        component: &str,
        name: &str,
    ) -> std::result::Result<Option<SettingRow>, BackendError> {
        let table = checked_table(table)?;
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, component, name, val FROM {table}
                     WHERE component = ?1 AND name = ?2
                     ORDER BY id LIMIT 1"
                ),
                params![component, name],
                row_to_setting,
            )
            .optional()?;
        Ok(row)
    }

    fn insert(&self, table: &str, row: &NewSetting) -> std::result::Result<RowId, BackendError> {
        let table = checked_table(table)?;
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO {table} (component, name, val) VALUES (?1, ?2, ?3)"),
            params![row.component, row.name, row.val],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_value(
        &self,
        table: &str,
        id: RowId,
        val: &str,
    ) -> std::result::Result<(), BackendError> {
        let table = checked_table(table)?;
        let conn = self.lock()?;
        conn.execute(
            &format!("UPDATE {table} SET val = ?1 WHERE id = ?2"),
            params![val, id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().expect("in-memory SQLite should open")
    }

    #[test]
    fn test_insert_and_fetch_one() {
        let backend = temp_backend();
        let id = backend
            .insert(CONFIG_TABLE, &NewSetting::new("core", "theme", "\"dark\""))
            .expect("insert should succeed");

        let row = backend
            .fetch_one(CONFIG_TABLE, "core", "theme")
            .unwrap()
            .expect("row should be present");
        assert_eq!(row.id, id);
        assert_eq!(row.val, "\"dark\"");

        assert!(backend.fetch_one(CONFIG_TABLE, "core", "missing").unwrap().is_none());
        assert!(backend.fetch_one(CONFIG_TABLE, "other", "theme").unwrap().is_none());
    }

    #[test]
    fn test_update_value_by_id() {
        let backend = temp_backend();
        let id = backend
            .insert(CONFIG_TABLE, &NewSetting::new("core", "retries", "1"))
            .unwrap();
        backend.update_value(CONFIG_TABLE, id, "5").unwrap();

        let rows = backend.fetch_all(CONFIG_TABLE).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].val, "5");
    }

    #[test]
    fn test_duplicates_are_not_rejected_by_schema() {
        let backend = temp_backend();
        backend.insert(CONFIG_TABLE, &NewSetting::new("core", "k", "1")).unwrap();
        backend.insert(CONFIG_TABLE, &NewSetting::new("core", "k", "2")).unwrap();

        assert_eq!(backend.row_count().unwrap(), 2);
        // the oldest row is the one the store will update
        let row = backend.fetch_one(CONFIG_TABLE, "core", "k").unwrap().unwrap();
        assert_eq!(row.val, "1");
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let backend = temp_backend();
        let err = backend.fetch_all("config; DROP TABLE config").unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.insert(CONFIG_TABLE, &NewSetting::new("mail", "host", "\"smtp\"")).unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        let rows = backend.fetch_all(CONFIG_TABLE).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].component, "mail");
    }
}
