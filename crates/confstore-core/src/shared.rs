//! Thread-safe handle around a [`ConfigStore`]
//!
//! Hosts that read settings from several threads share one
//! `SharedConfigStore`. Writers hold the write lock across the whole
//! fetch-then-insert sequence, so two threads setting the same new key
//! cannot both insert a row.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::store::ConfigStore;
use crate::value::{ConfigValue, Settings};

/// Cloneable, lock-guarded store
#[derive(Debug, Clone, Default)]
pub struct SharedConfigStore {
    inner: Arc<RwLock<ConfigStore>>,
}

impl SharedConfigStore {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self::new(ConfigStore::with_backend(backend))
    }

    // poisoned locks are recovered: no store operation leaves the maps half-written
    fn read(&self) -> RwLockReadGuard<'_, ConfigStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConfigStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bind_backend(&self, backend: Arc<dyn StorageBackend>) {
        self.write().bind_backend(backend);
    }

    pub fn load_from_backend(&self) -> Result<usize> {
        self.write().load_from_backend()
    }

    /// Owned copy of `component.name`
    pub fn get(&self, component: &str, name: &str) -> Option<ConfigValue> {
        self.read().get(component, name).cloned()
    }

    pub fn get_or(
        &self,
        component: &str,
        name: &str,
        fallback: impl Into<ConfigValue>,
    ) -> ConfigValue {
        self.read().get_or(component, name, fallback)
    }

    /// Owned copy of a whole component
    pub fn get_component(&self, component: &str) -> Option<Settings> {
        self.read().get_component(component).cloned()
    }

    pub fn set(&self, component: &str, name: &str, value: impl Into<ConfigValue>) -> Result<()> {
        self.write().set(component, name, value)
    }

    pub fn set_with(
        &self,
        component: &str,
        name: &str,
        value: impl Into<ConfigValue>,
        persist: bool,
    ) -> Result<()> {
        self.write().set_with(component, name, value, persist)
    }

    pub fn has_core(&self, name: &str) -> bool {
        self.read().has_core(name)
    }

    /// Run `f` with a read lock held, for several reads that must agree
    pub fn with_store<R>(&self, f: impl FnOnce(&ConfigStore) -> R) -> R {
        f(&self.read())
    }
}
