//! E2E tests for ConfigStore against SQLite
//!
//! Each test writes through one store and reads back through a fresh store
//! hydrated from the same database, the way a restarted host would.

use std::collections::BTreeMap;
use std::sync::Arc;

use confstore_core::backend::{NewSetting, SqliteBackend, StorageBackend, CONFIG_TABLE};
use confstore_core::{codec, ConfigStore, ConfigValue, Settings};

fn shared_backend() -> Arc<SqliteBackend> {
    Arc::new(SqliteBackend::open_in_memory().expect("in-memory SQLite should open"))
}

fn reloaded(backend: &Arc<SqliteBackend>) -> ConfigStore {
    let mut store = ConfigStore::with_backend(backend.clone());
    store.load_from_backend().expect("load should succeed");
    store
}

fn sample_values() -> Vec<ConfigValue> {
    let mut object = BTreeMap::new();
    object.insert("test".to_string(), ConfigValue::from("value"));

    let mut nested = BTreeMap::new();
    nested.insert("hosts".to_string(), ConfigValue::from(vec!["a", "b"]));
    nested.insert("limits".to_string(), ConfigValue::from(object.clone()));
    nested.insert("ratio".to_string(), ConfigValue::from(0.75));

    vec![
        ConfigValue::from("testval"),
        ConfigValue::from(vec![1, 2, 3]),
        ConfigValue::from(true),
        ConfigValue::from(3),
        ConfigValue::from(2.4),
        ConfigValue::from(2.0),
        ConfigValue::from(object),
        ConfigValue::Map(nested),
    ]
}

#[test]
fn e2e_datatypes_are_maintained() {
    for value in sample_values() {
        let backend = shared_backend();
        let mut store = ConfigStore::with_backend(backend.clone());
        store.set("core", "testconfig", value.clone()).unwrap();
        assert_eq!(store.get("core", "testconfig"), Some(&value));

        let fresh = reloaded(&backend);
        let actual = fresh.get("core", "testconfig").expect("value should be loaded");
        assert_eq!(actual, &value);
        assert_eq!(actual.type_name(), value.type_name());
    }
}

#[test]
fn e2e_namespaces_are_isolated() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());
    store.set("A", "k", "v1").unwrap();
    store.set("B", "k", "v2").unwrap();

    for store in [store, reloaded(&backend)] {
        assert_eq!(store.get("A", "k"), Some(&ConfigValue::from("v1")));
        assert_eq!(store.get("B", "k"), Some(&ConfigValue::from("v2")));
        assert_eq!(store.get_component("A").map(|s| s.len()), Some(1));
        assert_eq!(store.get("core", "k"), None);
    }
}

#[test]
fn e2e_fallback_only_for_unknown_keys() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());
    store.set("core", "retries", 0).unwrap();

    assert_eq!(store.get_or("core", "nonexistant", "fallback!"), ConfigValue::from("fallback!"));
    assert_eq!(store.get_or("core", "retries", 5), ConfigValue::Int(0));

    let fresh = reloaded(&backend);
    assert_eq!(fresh.get_or("core", "retries", 5), ConfigValue::Int(0));
    assert_eq!(fresh.get_or("core", "nonexistant", ConfigValue::Null), ConfigValue::Null);
}

#[test]
fn e2e_set_updates_existing_row() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());
    store.set("core", "test", "value1").unwrap();
    assert_eq!(store.get("core", "test"), Some(&ConfigValue::from("value1")));

    let mut second = reloaded(&backend);
    assert_eq!(second.get("core", "test"), Some(&ConfigValue::from("value1")));
    second.set("core", "test", "value2").unwrap();
    assert_eq!(second.get("core", "test"), Some(&ConfigValue::from("value2")));

    let third = reloaded(&backend);
    assert_eq!(third.get("core", "test"), Some(&ConfigValue::from("value2")));
    assert_eq!(backend.row_count().unwrap(), 1);
}

#[test]
fn e2e_local_set_is_not_persisted() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());
    store.set_with("core", "k", "session", false).unwrap();
    assert_eq!(store.get("core", "k"), Some(&ConfigValue::from("session")));

    let fresh = reloaded(&backend);
    assert_eq!(fresh.get("core", "k"), None);
    assert_eq!(backend.row_count().unwrap(), 0);
}

#[test]
fn e2e_get_without_name_returns_component() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());
    store.set("testcomponent", "test1", "one").unwrap();
    store.set("testcomponent", "test2", "two").unwrap();
    store.set("testcomponent", "test3", "three").unwrap();
    store.set("testcomponent2", "test1", "1").unwrap();
    store.set("testcomponent2", "test2", "2").unwrap();
    store.set("testcomponent2", "test3", "3").unwrap();

    let mut expected = Settings::new();
    expected.insert("test1".to_string(), ConfigValue::from("one"));
    expected.insert("test2".to_string(), ConfigValue::from("two"));
    expected.insert("test3".to_string(), ConfigValue::from("three"));

    assert_eq!(store.get_component("testcomponent"), Some(&expected));
    assert_eq!(
        store.lookup("testcomponent", None, ConfigValue::Null),
        ConfigValue::Map(expected.clone())
    );
    assert_eq!(store.lookup("unknown_comp", None, ConfigValue::Null), ConfigValue::Null);
    assert_eq!(reloaded(&backend).get_component("testcomponent"), Some(&expected));
}

#[test]
fn e2e_load_picks_up_external_rows() {
    let backend = shared_backend();
    let mut store = ConfigStore::with_backend(backend.clone());

    assert_eq!(store.get("core", "test"), None);
    assert_eq!(store.load_from_backend().unwrap(), 0);
    assert_eq!(store.get("core", "test"), None);

    let val = codec::encode(&ConfigValue::from("hello world!")).unwrap();
    backend
        .insert(CONFIG_TABLE, &NewSetting::new("core", "test", val))
        .unwrap();

    assert_eq!(store.load_from_backend().unwrap(), 1);
    assert_eq!(store.get("core", "test"), Some(&ConfigValue::from("hello world!")));
}

#[test]
fn e2e_undecodable_row_loads_as_text() {
    let backend = shared_backend();
    backend
        .insert(CONFIG_TABLE, &NewSetting::new("legacy", "motd", "s:5:\"hello\";"))
        .unwrap();

    let store = reloaded(&backend);
    assert_eq!(store.get("legacy", "motd"), Some(&ConfigValue::from("s:5:\"hello\";")));
}

#[test]
fn e2e_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("confstore.db");

    {
        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        let mut store = ConfigStore::with_backend(backend);
        store.set_core("site_name", "Example").unwrap();
        store.set("mail", "ports", vec![25, 587]).unwrap();
    }

    let backend = Arc::new(SqliteBackend::open(&path).unwrap());
    let mut store = ConfigStore::with_backend(backend);
    assert_eq!(store.load_from_backend().unwrap(), 2);
    assert_eq!(store.core("site_name"), Some(&ConfigValue::from("Example")));
    assert_eq!(store.get("mail", "ports"), Some(&ConfigValue::from(vec![25, 587])));
}
