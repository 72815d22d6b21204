//! ConfigStore — namespaced settings cache with write-through persistence
//!
//! The store keeps `component -> name -> value` in memory. Reads are served
//! from the cache only. Writes update the cache first and then, unless
//! suppressed, the bound backend before returning.
//!
//! # Invariants
//!
//! 1. One cache entry per `(component, name)`; setting again overwrites
//! 2. A persisted `set` has reached the backend when it returns `Ok`
//! 3. At most one backend row per `(component, name)` is created by the store
//! 4. Loading lets backend rows overwrite cached values for the same key
//!
//! A failed backend write leaves the new value in the cache. The cache and
//! the backend then disagree until the key is set or loaded again.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{NewSetting, StorageBackend, CONFIG_TABLE};
use crate::codec;
use crate::error::{ConfigError, Result, ResultExt};
use crate::value::{ConfigValue, Settings};

/// Default component namespace
pub const CORE_COMPONENT: &str = "core";

/// Two-level settings cache bound to an optional backend
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use confstore_core::{ConfigStore, ConfigValue};
/// use confstore_core::backend::SqliteBackend;
///
/// let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
/// let mut store = ConfigStore::new();
/// store.bind_backend(backend.clone());
///
/// store.set("mail", "port", 587).unwrap();
/// assert_eq!(store.get_or("mail", "port", 25), ConfigValue::Int(587));
///
/// // A second store sees the persisted value after hydrating
/// let mut other = ConfigStore::with_backend(backend);
/// other.load_from_backend().unwrap();
/// assert_eq!(other.get_as::<i64>("mail", "port"), Some(587));
/// ```
pub struct ConfigStore {
    settings: HashMap<String, Settings>,
    backend: Option<Arc<dyn StorageBackend>>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("settings", &self.settings)
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Empty store with only the `core` namespace
    pub fn new() -> Self {
        let mut settings = HashMap::new();
        settings.insert(CORE_COMPONENT.to_string(), Settings::new());
        Self {
            settings,
            backend: None,
        }
    }

    /// Empty store already bound to `backend`
    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        let mut store = Self::new();
        store.bind_backend(backend);
        store
    }

    /// Bind the store to a backend, replacing any previous one
    pub fn bind_backend(&mut self, backend: Arc<dyn StorageBackend>) {
        self.backend = Some(backend);
    }

    /// Drop the backend binding, returning it
    pub fn unbind_backend(&mut self) -> Option<Arc<dyn StorageBackend>> {
        self.backend.take()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<&Arc<dyn StorageBackend>> {
        self.backend.as_ref().ok_or(ConfigError::NoBackend)
    }

    /// Hydrate the cache from every backend row.
    ///
    /// Backend values overwrite cached ones for the same key; keys that only
    /// exist in the cache are kept. Returns the number of rows merged.
    pub fn load_from_backend(&mut self) -> Result<usize> {
        let rows = self
            .backend()?
            .fetch_all(CONFIG_TABLE)
            .context("Loading config rows")?;

        let count = rows.len();
        for row in rows {
            let value = codec::decode_lossy(&row.val);
            self.settings
                .entry(row.component)
                .or_default()
                .insert(row.name, value);
        }
        tracing::debug!("Loaded {} config rows from backend", count);
        Ok(count)
    }

    /// The value of `component.name`, if set or loaded
    pub fn get(&self, component: &str, name: &str) -> Option<&ConfigValue> {
        self.settings.get(component)?.get(name)
    }

    /// The value of `component.name`, or `fallback`
    ///
    /// Stored falsy values (`false`, `0`, `""`, `null`) are returned as is;
    /// only an absent key yields the fallback.
    pub fn get_or(
        &self,
        component: &str,
        name: &str,
        fallback: impl Into<ConfigValue>,
    ) -> ConfigValue {
        match self.get(component, name) {
            Some(value) => value.clone(),
            None => fallback.into(),
        }
    }

    /// Typed read; `None` when absent or of another type
    pub fn get_as<'a, T>(&'a self, component: &str, name: &str) -> Option<T>
    where
        T: TryFrom<&'a ConfigValue>,
    {
        self.get(component, name).and_then(|v| T::try_from(v).ok())
    }

    /// Every setting of `component`, read-only
    pub fn get_component(&self, component: &str) -> Option<&Settings> {
        self.settings.get(component)
    }

    /// Two-mode lookup: one setting when `name` is given, otherwise the
    /// whole component as a map. `fallback` answers misses in both modes.
    pub fn lookup(
        &self,
        component: &str,
        name: Option<&str>,
        fallback: impl Into<ConfigValue>,
    ) -> ConfigValue {
        let hit = match name {
            Some(name) => self.get(component, name).cloned(),
            None => self
                .get_component(component)
                .map(|settings| ConfigValue::Map(settings.clone())),
        };
        hit.unwrap_or_else(|| fallback.into())
    }

    /// Known component names, in no particular order
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.settings.keys().map(String::as_str)
    }

    /// Set and persist `component.name`
    pub fn set(
        &mut self,
        component: &str,
        name: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<()> {
        self.set_with(component, name, value, true)
    }

    /// Set `component.name` for this session only
    pub fn set_local(&mut self, component: &str, name: &str, value: impl Into<ConfigValue>) {
        let value = value.into();
        self.settings
            .entry(component.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Set `component.name`, writing through to the backend when `persist`.
    ///
    /// The cache is updated before the backend is touched, so a backend
    /// error leaves the new value visible to readers of this store. A value
    /// that cannot be encoded is rejected before the cache changes.
    pub fn set_with(
        &mut self,
        component: &str,
        name: &str,
        value: impl Into<ConfigValue>,
        persist: bool,
    ) -> Result<()> {
        let value = value.into();
        let encoded = if persist {
            Some(codec::encode(&value)?)
        } else {
            None
        };
        self.set_local(component, name, value);

        if let Some(val) = encoded {
            self.persist(component, name, &val)
                .with_context(|| format!("Persisting {component}.{name}"))?;
        }
        Ok(())
    }

    fn persist(&self, component: &str, name: &str, val: &str) -> Result<()> {
        let backend = self.backend()?;
        match backend.fetch_one(CONFIG_TABLE, component, name)? {
            Some(existing) => {
                backend.update_value(CONFIG_TABLE, existing.id, val)?;
                tracing::debug!("Updated config row {} ({}.{})", existing.id, component, name);
            }
            None => {
                let id = backend.insert(CONFIG_TABLE, &NewSetting::new(component, name, val))?;
                tracing::debug!("Inserted config row {} ({}.{})", id, component, name);
            }
        }
        Ok(())
    }

    /// `core.name`, if present
    pub fn core(&self, name: &str) -> Option<&ConfigValue> {
        self.get(CORE_COMPONENT, name)
    }

    /// Set and persist `core.name`
    pub fn set_core(&mut self, name: &str, value: impl Into<ConfigValue>) -> Result<()> {
        self.set(CORE_COMPONENT, name, value)
    }

    /// Whether `core.name` is in the cache; the backend is not consulted
    pub fn has_core(&self, name: &str) -> bool {
        self.settings
            .get(CORE_COMPONENT)
            .is_some_and(|core| core.contains_key(name))
    }
}
