//! The dial registry
//!
//! Owns every registered dial, notifies listeners, and persists values through
//! an optional `PersistentStore`. Notification happens on two channels:
//! - per-dial listeners are called synchronously inside `set_value`
//! - registry-wide listeners are queued and only run when the host calls
//!   `flush_notifications`, one scheduling step after the change
//!
//! `DialRegistry` is a cheap handle; clones share the same registry.

use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::manifest::Manifest;
use crate::models::{Dial, DialConfig, DialGroup, DialValue};
use crate::store::{storage_key, PersistentStore, DEFAULT_STORAGE_PREFIX, STORAGE_VERSION};

mod listeners;

pub use listeners::{RegistryListener, ValueListener};
use listeners::{ListenerTarget, Listeners};

/// Options for building a registry
#[derive(Clone)]
pub struct RegistryOptions {
    pub storage_prefix: String,
    pub storage_version: u32,
    /// Scope used to namespace the persisted record
    pub project_id: Option<String>,
    pub store: Option<Arc<dyn PersistentStore>>,
    pub manifest: Option<Manifest>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            storage_version: STORAGE_VERSION,
            project_id: None,
            store: None,
            manifest: None,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    dials: Vec<Dial>,
    index: HashMap<String, usize>,
    project_id: Option<String>,
    /// Last known persisted record for the current scope
    persisted: Map<String, Value>,
}

impl RegistryState {
    fn get(&self, id: &str) -> Option<&Dial> {
        self.index.get(id).map(|&i| &self.dials[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Dial> {
        match self.index.get(id) {
            Some(&i) => self.dials.get_mut(i),
            None => None,
        }
    }

    fn insert(&mut self, dial: Dial) {
        self.index.insert(dial.id.clone(), self.dials.len());
        self.dials.push(dial);
    }
}

struct Shared {
    state: Mutex<RegistryState>,
    /// Serializes writers from the in-memory update through the store write
    /// and per-dial dispatch. Reentrant so listeners may write back.
    writes: ReentrantMutex<()>,
    listeners: Mutex<Listeners>,
    pending: AtomicUsize,
    store: Option<Arc<dyn PersistentStore>>,
    manifest: Option<Manifest>,
    storage_prefix: String,
    storage_version: u32,
}

impl Shared {
    fn storage_key(&self, project_id: Option<&str>) -> String {
        storage_key(&self.storage_prefix, project_id, self.storage_version)
    }

    /// Read the persisted record for `key`; any failure yields an empty record
    fn load_persisted(&self, key: &str) -> Map<String, Value> {
        let Some(store) = &self.store else {
            return Map::new();
        };

        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read persisted dials");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(key, "Persisted dials record is not an object, ignoring");
                Map::new()
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to parse persisted dials");
                Map::new()
            }
        }
    }

    fn write_persisted(&self, key: &str, record: &Map<String, Value>) {
        let Some(store) = &self.store else {
            return;
        };

        let blob = match serde_json::to_string(record) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize dials");
                return;
            }
        };

        if let Err(e) = store.set(key, &blob) {
            warn!(key, error = %e, "Failed to persist dials");
        }
    }
}

/// Handle returned by `subscribe` and `subscribe_to_registry`
///
/// Dropping the handle leaves the listener installed; call `unsubscribe`.
pub struct Subscription {
    shared: Weak<Shared>,
    target: ListenerTarget,
    token: u64,
}

impl Subscription {
    /// Remove the listener. Returns false if the registry is gone or the
    /// listener was already removed.
    pub fn unsubscribe(self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.listeners.lock().remove(&self.target, self.token),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("token", &self.token)
            .finish()
    }
}

/// Registry of dials
#[derive(Clone)]
pub struct DialRegistry {
    shared: Arc<Shared>,
}

impl DialRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        let shared = Shared {
            state: Mutex::new(RegistryState::default()),
            writes: ReentrantMutex::new(()),
            listeners: Mutex::new(Listeners::default()),
            pending: AtomicUsize::new(0),
            store: options.store,
            manifest: options.manifest,
            storage_prefix: options.storage_prefix,
            storage_version: options.storage_version,
        };

        let key = shared.storage_key(options.project_id.as_deref());
        let persisted = shared.load_persisted(&key);
        {
            let mut state = shared.state.lock();
            state.project_id = options.project_id;
            state.persisted = persisted;
        }

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Registry without persistence
    pub fn in_memory() -> Self {
        Self::new(RegistryOptions::default())
    }

    /// Registry persisting through `store` with default prefix and version
    pub fn with_store(store: Arc<dyn PersistentStore>) -> Self {
        Self::new(RegistryOptions {
            store: Some(store),
            ..RegistryOptions::default()
        })
    }

    /// Register a dial, or return the current value of an existing one.
    ///
    /// The first registration's config is kept; later configs are ignored.
    pub fn register(&self, id: &str, config: impl Into<DialConfig>) -> DialValue {
        let config = config.into();
        let value = {
            let mut state = self.shared.state.lock();
            if let Some(existing) = state.get(id) {
                if existing.config != config {
                    debug!(dial_id = id, "Dial already registered, ignoring new config");
                }
                return existing.current_value.clone();
            }

            let value = state
                .persisted
                .get(id)
                .and_then(DialValue::from_json)
                .unwrap_or_else(|| config.default_value());

            state.insert(Dial {
                id: id.to_string(),
                kind: config.kind(),
                config,
                current_value: value.clone(),
                updated_at: now_millis(),
            });
            value
        };

        debug!(dial_id = id, value = %value, "Registered dial");
        self.schedule_notification();
        value
    }

    /// Set a dial's value, persist it, and notify listeners.
    ///
    /// Unknown ids are logged and ignored.
    pub fn set_value(&self, id: &str, value: impl Into<DialValue>) {
        let value = value.into();
        let _writes = self.shared.writes.lock();
        let (key, record) = {
            let mut state = self.shared.state.lock();
            let Some(dial) = state.get_mut(id) else {
                warn!(dial_id = id, "set_value called for unknown dial");
                return;
            };
            dial.current_value = value.clone();
            dial.updated_at = now_millis();

            state.persisted.insert(id.to_string(), value_to_json(&value));
            let key = self.shared.storage_key(state.project_id.as_deref());
            (key, state.persisted.clone())
        };

        self.shared.write_persisted(&key, &record);

        let listeners = self.shared.listeners.lock().dial_listeners(id);
        for listener in listeners {
            listener(id, &value);
        }

        self.schedule_notification();
    }

    pub fn get_value(&self, id: &str) -> Option<DialValue> {
        self.shared
            .state
            .lock()
            .get(id)
            .map(|d| d.current_value.clone())
    }

    pub fn get_dial(&self, id: &str) -> Option<Dial> {
        self.shared.state.lock().get(id).cloned()
    }

    /// Snapshot of all dials in registration order
    pub fn get_all_dials(&self) -> Vec<Dial> {
        self.shared.state.lock().dials.clone()
    }

    /// Dials grouped by `config.group`, groups in first-seen order
    pub fn get_dials_by_group(&self) -> Vec<DialGroup> {
        group_dials(self.get_all_dials())
    }

    /// Restore a dial's default value
    pub fn reset(&self, id: &str) {
        let default = self
            .shared
            .state
            .lock()
            .get(id)
            .map(|d| d.config.default_value());

        match default {
            Some(default) => self.set_value(id, default),
            None => warn!(dial_id = id, "reset called for unknown dial"),
        }
    }

    /// Reset every dial registered at the time of the call
    pub fn reset_all(&self) {
        let ids: Vec<String> = self
            .shared
            .state
            .lock()
            .dials
            .iter()
            .map(|d| d.id.clone())
            .collect();

        for id in ids {
            self.reset(&id);
        }
    }

    /// Listen for value changes of one dial
    pub fn subscribe<F>(&self, id: &str, listener: F) -> Subscription
    where
        F: Fn(&str, &DialValue) + Send + Sync + 'static,
    {
        let token = self.shared.listeners.lock().add_dial(id, Arc::new(listener));
        Subscription {
            shared: Arc::downgrade(&self.shared),
            target: ListenerTarget::Dial(id.to_string()),
            token,
        }
    }

    /// Listen for any registration or value change (deferred)
    pub fn subscribe_to_registry<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let token = self.shared.listeners.lock().add_registry(Arc::new(listener));
        Subscription {
            shared: Arc::downgrade(&self.shared),
            target: ListenerTarget::Registry,
            token,
        }
    }

    /// Switch the persistence scope.
    ///
    /// Future registrations and writes use the new scope's record. Values of
    /// dials that are already registered are left as they are.
    pub fn set_project_id(&self, project_id: Option<&str>) {
        let _writes = self.shared.writes.lock();
        let key = self.shared.storage_key(project_id);
        let persisted = self.shared.load_persisted(&key);

        let mut state = self.shared.state.lock();
        state.project_id = project_id.map(str::to_string);
        state.persisted = persisted;
        debug!(key = %key, "Switched dial persistence scope");
    }

    pub fn project_id(&self) -> Option<String> {
        self.shared.state.lock().project_id.clone()
    }

    /// Key of the persisted record for the current scope
    pub fn storage_key(&self) -> String {
        let state = self.shared.state.lock();
        self.shared.storage_key(state.project_id.as_deref())
    }

    /// Current value of every registered dial
    pub fn export_values(&self) -> BTreeMap<String, DialValue> {
        self.shared
            .state
            .lock()
            .dials
            .iter()
            .map(|d| (d.id.clone(), d.current_value.clone()))
            .collect()
    }

    pub fn export_dials(&self) -> Vec<Dial> {
        self.get_all_dials()
    }

    /// Remove the current scope's persisted record. No-op without a store.
    pub fn clear_storage(&self) {
        let Some(store) = &self.shared.store else {
            debug!("No persistent store, nothing to clear");
            return;
        };

        let _writes = self.shared.writes.lock();
        let key = {
            let mut state = self.shared.state.lock();
            state.persisted.clear();
            self.shared.storage_key(state.project_id.as_deref())
        };

        if let Err(e) = store.remove(&key) {
            warn!(key = %key, error = %e, "Failed to clear persisted dials");
        }
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.shared.manifest.as_ref()
    }

    pub fn has_store(&self) -> bool {
        self.shared.store.is_some()
    }

    /// The store this registry persists through, shared with other consumers
    pub fn store(&self) -> Option<Arc<dyn PersistentStore>> {
        self.shared.store.clone()
    }

    pub fn storage_prefix(&self) -> &str {
        &self.shared.storage_prefix
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().dials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registry-wide notifications waiting for the next flush
    pub fn pending_notifications(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Deliver queued registry-wide notifications.
    ///
    /// Each queued notification calls every registry listener once.
    /// Notifications queued while flushing wait for the next flush. Returns
    /// the number of notifications delivered.
    pub fn flush_notifications(&self) -> usize {
        let count = self.shared.pending.swap(0, Ordering::SeqCst);
        for _ in 0..count {
            let listeners = self.shared.listeners.lock().registry_listeners();
            for listener in listeners {
                listener();
            }
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn listener_counts(&self, id: &str) -> (usize, usize) {
        let listeners = self.shared.listeners.lock();
        (
            listeners.dial_listener_count(id),
            listeners.registry_listener_count(),
        )
    }

    fn schedule_notification(&self) {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for DialRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for DialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DialRegistry")
            .field("dials", &state.dials.len())
            .field("project_id", &state.project_id)
            .field("has_store", &self.shared.store.is_some())
            .finish()
    }
}

/// Group dials by their `group`, keeping first-occurrence order
pub fn group_dials(dials: Vec<Dial>) -> Vec<DialGroup> {
    let mut groups: Vec<DialGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for dial in dials {
        let name = dial.config.group_or_default().to_string();
        match positions.get(&name) {
            Some(&i) => groups[i].dials.push(dial),
            None => {
                positions.insert(name.clone(), groups.len());
                groups.push(DialGroup {
                    name,
                    dials: vec![dial],
                });
            }
        }
    }

    groups
}

fn value_to_json(value: &DialValue) -> Value {
    match value {
        DialValue::Bool(b) => Value::Bool(*b),
        DialValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        DialValue::Text(s) => Value::String(s.clone()),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

static GLOBAL: Lazy<Mutex<Option<DialRegistry>>> = Lazy::new(|| Mutex::new(None));

/// The process-wide registry, created in-memory on first use
pub fn global() -> DialRegistry {
    GLOBAL
        .lock()
        .get_or_insert_with(DialRegistry::in_memory)
        .clone()
}

/// Install `registry` as the process-wide registry, returning the previous one
pub fn install_global(registry: DialRegistry) -> Option<DialRegistry> {
    GLOBAL.lock().replace(registry)
}

/// Drop the process-wide registry so the next `global()` starts clean
pub fn reset_global() -> Option<DialRegistry> {
    GLOBAL.lock().take()
}
