// Integration tests for the dial registry
// Covers registration, persistence, notification timing, grouping, and scopes

use anyhow::Result;
use dials::models::{BooleanConfig, ColorConfig, NumberConfig, VariantConfig};
use dials::registry::{DialRegistry, RegistryOptions};
use dials::store::{MemoryStore, PersistentStore, SqliteStore, StoreError};
use dials::{DialConfig, DialValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Store whose every operation fails
struct BrokenStore;

impl PersistentStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }
}

fn scoped(store: &Arc<MemoryStore>, project_id: Option<&str>) -> DialRegistry {
    DialRegistry::new(RegistryOptions {
        store: Some(store.clone()),
        project_id: project_id.map(str::to_string),
        ..RegistryOptions::default()
    })
}

#[test]
fn test_opacity_scenario() {
    let registry = DialRegistry::in_memory();

    assert_eq!(
        registry.register("opacity", NumberConfig::new(0.5)),
        DialValue::Number(0.5)
    );
    registry.set_value("opacity", 0.8);
    assert_eq!(registry.get_value("opacity"), Some(DialValue::Number(0.8)));

    registry.reset("opacity");
    assert_eq!(registry.get_value("opacity"), Some(DialValue::Number(0.5)));

    let exported = registry.export_values();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported.get("opacity"), Some(&DialValue::Number(0.5)));
}

#[test]
fn test_first_registration_wins() {
    let registry = DialRegistry::in_memory();
    let mut first = NumberConfig::new(1.0);
    first.label = Some("First".to_string());

    let a = registry.register("x", first.clone());
    let b = registry.register("x", NumberConfig::new(2.0));

    assert_eq!(a, DialValue::Number(1.0));
    assert_eq!(a, b);
    assert_eq!(
        registry.get_dial("x").map(|d| d.config),
        Some(DialConfig::Number(first))
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_persisted_value_wins_over_default() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set("dials-v1", r#"{"theme":"dark","gap":12}"#)?;

    let registry = DialRegistry::with_store(store.clone());
    let theme = registry.register(
        "theme",
        VariantConfig::new("light", vec!["light".to_string(), "dark".to_string()]),
    );
    let other = registry.register("other", BooleanConfig::new(true));

    assert_eq!(theme, DialValue::from("dark"));
    assert_eq!(other, DialValue::Bool(true));
    Ok(())
}

#[test]
fn test_values_survive_new_session() {
    let store = Arc::new(MemoryStore::new());

    let first = DialRegistry::with_store(store.clone());
    first.register("accent", ColorConfig::new("#3b82f6"));
    first.set_value("accent", "#ef4444");

    let second = DialRegistry::with_store(store.clone());
    assert_eq!(
        second.register("accent", ColorConfig::new("#3b82f6")),
        DialValue::from("#ef4444")
    );
}

#[test]
fn test_unpersisted_ids_are_kept_in_record() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set("dials-v1", r#"{"later":true}"#)?;

    let registry = DialRegistry::with_store(store.clone());
    registry.register("now", NumberConfig::new(1.0));
    registry.set_value("now", 2.0);

    let raw = store.get("dials-v1")?.unwrap_or_default();
    let record: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(record["later"], serde_json::json!(true));
    assert_eq!(record["now"], serde_json::json!(2.0));
    Ok(())
}

#[test]
fn test_unknown_id_is_ignored() {
    let registry = DialRegistry::in_memory();
    registry.set_value("nope", 1);
    registry.reset("nope");

    assert!(registry.get_dial("nope").is_none());
    assert!(registry.is_empty());
    assert_eq!(registry.pending_notifications(), 0);
}

#[test]
fn test_per_dial_listener_is_synchronous_registry_listener_is_deferred() {
    let registry = DialRegistry::in_memory();
    registry.register("x", NumberConfig::new(1.0));
    registry.flush_notifications();

    let seen: Arc<Mutex<Vec<(String, DialValue)>>> = Arc::new(Mutex::new(Vec::new()));
    let wide = Arc::new(AtomicUsize::new(0));

    let sink = seen.clone();
    registry.subscribe("x", move |id, value| {
        sink.lock().unwrap().push((id.to_string(), value.clone()));
    });
    let counter = wide.clone();
    registry.subscribe_to_registry(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.set_value("x", 9.0);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("x".to_string(), DialValue::Number(9.0))]
    );
    assert_eq!(wide.load(Ordering::SeqCst), 0);
    assert_eq!(registry.pending_notifications(), 1);

    assert_eq!(registry.flush_notifications(), 1);
    assert_eq!(wide.load(Ordering::SeqCst), 1);
}

#[test]
fn test_registration_notifies_registry_listeners_only() {
    let registry = DialRegistry::in_memory();
    let per_dial = Arc::new(AtomicUsize::new(0));
    let wide = Arc::new(AtomicUsize::new(0));

    let counter = per_dial.clone();
    registry.subscribe("x", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = wide.clone();
    registry.subscribe_to_registry(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.register("x", NumberConfig::new(1.0));
    registry.register("x", NumberConfig::new(1.0));
    registry.flush_notifications();

    assert_eq!(per_dial.load(Ordering::SeqCst), 0);
    assert_eq!(wide.load(Ordering::SeqCst), 1);
}

#[test]
fn test_changes_made_while_flushing_wait_for_next_flush() {
    let registry = DialRegistry::in_memory();
    registry.register("x", NumberConfig::new(1.0));
    registry.flush_notifications();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let inner = registry.clone();
    registry.subscribe_to_registry(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            inner.set_value("x", 3.0);
        }
    });

    registry.set_value("x", 2.0);
    assert_eq!(registry.flush_notifications(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.pending_notifications(), 1);

    assert_eq!(registry.flush_notifications(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribed_listener_is_not_called() {
    let registry = DialRegistry::in_memory();
    registry.register("x", NumberConfig::new(1.0));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subscription = registry.subscribe("x", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.set_value("x", 2.0);
    assert!(subscription.unsubscribe());
    registry.set_value("x", 3.0);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_grouping_defaults_and_order() {
    let registry = DialRegistry::in_memory();

    let mut shadow = BooleanConfig::new(true);
    shadow.group = Some("Cards".to_string());
    let mut radius = NumberConfig::new(4.0);
    radius.group = Some("Cards".to_string());

    registry.register("loose", BooleanConfig::new(false));
    registry.register("shadow", shadow);
    registry.register("radius", radius);

    let groups = registry.get_dials_by_group();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Ungrouped", "Cards"]);

    let cards: Vec<&str> = groups[1].dials.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(cards, vec!["shadow", "radius"]);
}

#[test]
fn test_reset_all_restores_defaults() {
    let registry = DialRegistry::in_memory();
    registry.register("a", NumberConfig::new(1.0));
    registry.register("b", BooleanConfig::new(false));
    registry.set_value("a", 5.0);
    registry.set_value("b", true);

    registry.reset_all();

    assert!(registry.get_all_dials().iter().all(|d| d.is_default()));
}

#[test]
fn test_export_dials_matches_registry() {
    let registry = DialRegistry::in_memory();
    registry.register("a", NumberConfig::new(1.0));
    registry.register("b", ColorConfig::new("#000"));

    let dials = registry.export_dials();
    assert_eq!(dials.len(), 2);
    assert_eq!(dials[1].current_value, DialValue::from("#000"));

    let values = registry.export_values();
    let ids: Vec<&String> = values.keys().collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_clear_storage_gives_defaults_next_session() {
    let store = Arc::new(MemoryStore::new());

    let first = scoped(&store, Some("dashboard"));
    first.register("gap", NumberConfig::new(8.0));
    first.set_value("gap", 24.0);
    first.clear_storage();

    // In-memory value is unaffected until the next session
    assert_eq!(first.get_value("gap"), Some(DialValue::Number(24.0)));

    let second = scoped(&store, Some("dashboard"));
    assert_eq!(
        second.register("gap", NumberConfig::new(8.0)),
        DialValue::Number(8.0)
    );
}

#[test]
fn test_clear_storage_without_store_is_noop() {
    let registry = DialRegistry::in_memory();
    registry.register("a", NumberConfig::new(1.0));
    registry.clear_storage();
    assert_eq!(registry.get_value("a"), Some(DialValue::Number(1.0)));
}

#[test]
fn test_scopes_are_isolated() {
    let store = Arc::new(MemoryStore::new());

    let alpha = scoped(&store, Some("alpha"));
    alpha.register("gap", NumberConfig::new(8.0));
    alpha.set_value("gap", 16.0);
    assert_eq!(alpha.storage_key(), "dials-alpha-v1");

    let beta = scoped(&store, Some("beta"));
    assert_eq!(
        beta.register("gap", NumberConfig::new(8.0)),
        DialValue::Number(8.0)
    );
}

#[test]
fn test_scope_switch_keeps_session_values() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set("dials-beta-v1", r#"{"gap":32,"fresh":true}"#)?;

    let registry = scoped(&store, Some("alpha"));
    registry.register("gap", NumberConfig::new(8.0));
    registry.set_value("gap", 16.0);

    registry.set_project_id(Some("beta"));
    assert_eq!(registry.project_id().as_deref(), Some("beta"));

    // Already-registered dials keep their session value
    assert_eq!(registry.get_value("gap"), Some(DialValue::Number(16.0)));
    // New registrations resolve against the new scope
    assert_eq!(
        registry.register("fresh", BooleanConfig::new(false)),
        DialValue::Bool(true)
    );

    // Writes go to the new scope only
    registry.set_value("gap", 20.0);
    let alpha: serde_json::Value =
        serde_json::from_str(&store.get("dials-alpha-v1")?.unwrap_or_default())?;
    let beta: serde_json::Value =
        serde_json::from_str(&store.get("dials-beta-v1")?.unwrap_or_default())?;
    assert_eq!(alpha["gap"], serde_json::json!(16.0));
    assert_eq!(beta["gap"], serde_json::json!(20.0));
    Ok(())
}

#[test]
fn test_broken_store_degrades_to_memory() {
    let registry = DialRegistry::with_store(Arc::new(BrokenStore));

    assert_eq!(
        registry.register("x", NumberConfig::new(1.0)),
        DialValue::Number(1.0)
    );
    registry.set_value("x", 2.0);
    registry.clear_storage();
    registry.set_project_id(Some("other"));

    assert_eq!(registry.get_value("x"), Some(DialValue::Number(2.0)));
}

#[test]
fn test_corrupt_record_is_ignored() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set("dials-v1", "{not json")?;

    let registry = DialRegistry::with_store(store.clone());
    assert_eq!(
        registry.register("x", NumberConfig::new(1.0)),
        DialValue::Number(1.0)
    );

    store.set("dials-v1", r#"{"x":{"nested":1}}"#)?;
    let registry = DialRegistry::with_store(store);
    assert_eq!(
        registry.register("x", NumberConfig::new(1.0)),
        DialValue::Number(1.0)
    );
    Ok(())
}

#[test]
fn test_sqlite_store_backs_registry() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("store.db");

    {
        let registry = DialRegistry::with_store(Arc::new(SqliteStore::open(&path)?));
        registry.register("dense", BooleanConfig::new(false));
        registry.set_value("dense", true);
    }

    let registry = DialRegistry::with_store(Arc::new(SqliteStore::open(&path)?));
    assert_eq!(
        registry.register("dense", BooleanConfig::new(false)),
        DialValue::Bool(true)
    );
    Ok(())
}

#[test]
fn test_registry_is_usable_across_threads() {
    let registry = DialRegistry::in_memory();
    registry.register("count", NumberConfig::new(0.0));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                registry.register(&format!("t{}", i), BooleanConfig::new(true));
                registry.set_value("count", f64::from(i));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 5);
    assert_eq!(registry.pending_notifications(), 1 + 4 + 4);
}

/// Memory store that stalls writes of one particular record
struct SlowStore {
    inner: MemoryStore,
    slow_record: &'static str,
}

impl PersistentStore for SlowStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if value == self.slow_record {
            std::thread::sleep(std::time::Duration::from_millis(300));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

#[test]
fn test_concurrent_writes_reach_store_in_memory_order() -> Result<()> {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        slow_record: r#"{"x":1.0}"#,
    });
    let registry = DialRegistry::with_store(store.clone());
    registry.register("x", NumberConfig::new(0.0));

    let writer = registry.clone();
    let slow = std::thread::spawn(move || writer.set_value("x", 1.0));
    std::thread::sleep(std::time::Duration::from_millis(50));
    registry.set_value("x", 2.0);
    slow.join().expect("writer thread panicked");

    assert_eq!(registry.get_value("x"), Some(DialValue::Number(2.0)));
    assert_eq!(store.get("dials-v1")?.as_deref(), Some(r#"{"x":2.0}"#));

    let next_session = DialRegistry::with_store(store);
    assert_eq!(
        next_session.register("x", NumberConfig::new(0.0)),
        DialValue::Number(2.0)
    );
    Ok(())
}

#[test]
fn test_listener_may_write_back_from_inside_set_value() {
    let registry = DialRegistry::in_memory();
    registry.register("a", NumberConfig::new(0.0));
    registry.register("b", NumberConfig::new(0.0));

    let inner = registry.clone();
    let _subscription = registry.subscribe("a", move |_, value| {
        inner.set_value("b", value.clone());
    });

    registry.set_value("a", 3.0);
    assert_eq!(registry.get_value("b"), Some(DialValue::Number(3.0)));
}
