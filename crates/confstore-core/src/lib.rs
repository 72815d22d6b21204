//! Confstore Core - namespaced configuration cache with write-through storage
//!
//! Settings are grouped by component (a plugin or subsystem name) and keyed
//! by name. The store hydrates its cache from a backend table once, serves
//! every read from memory with a caller-supplied fallback, and mirrors each
//! write to the backend before returning.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use confstore_core::{ConfigStore, ConfigValue};
//! use confstore_core::backend::SqliteBackend;
//!
//! let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
//! let mut config = ConfigStore::with_backend(backend);
//! config.load_from_backend().unwrap();
//!
//! config.set_core("site_name", "Example").unwrap();
//! config.set("mail", "ports", vec![25, 587]).unwrap();
//!
//! assert_eq!(config.core("site_name"), Some(&ConfigValue::from("Example")));
//! assert_eq!(config.get_or("mail", "tls", false), ConfigValue::Bool(false));
//! ```
//!
//! # Modules
//!
//! - `store`: the [`ConfigStore`] cache and its get/set contract
//! - `value`: [`ConfigValue`], the structured value type
//! - `codec`: JSON text encoding of values for the `val` column
//! - `backend`: the [`StorageBackend`](backend::StorageBackend) trait, SQLite and in-memory rows
//! - `shared`: [`SharedConfigStore`], a lock-guarded handle for threaded hosts
//! - `settings`: [`StoreSettings`] read from TOML

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod backend;
pub mod codec;
pub mod error;
pub mod settings;
pub mod shared;
pub mod store;
pub mod value;

pub use error::{BackendError, ConfigError, Result};
pub use settings::{JournalMode, StoreSettings};
pub use shared::SharedConfigStore;
pub use store::{ConfigStore, CORE_COMPONENT};
pub use value::{ConfigValue, Settings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
