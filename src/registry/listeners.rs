//! Listener bookkeeping for the registry's two notification channels

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::DialValue;

/// Called synchronously with `(id, value)` whenever that dial's value is set
pub type ValueListener = Arc<dyn Fn(&str, &DialValue) + Send + Sync>;

/// Called once per deferred registry-wide notification
pub type RegistryListener = Arc<dyn Fn() + Send + Sync>;

/// Which channel a subscription belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListenerTarget {
    Dial(String),
    Registry,
}

/// Per-dial and registry-wide listener sets, keyed by a subscription token
#[derive(Default)]
pub(crate) struct Listeners {
    next_token: u64,
    by_dial: HashMap<String, Vec<(u64, ValueListener)>>,
    registry: Vec<(u64, RegistryListener)>,
}

impl Listeners {
    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    pub(crate) fn add_dial(&mut self, id: &str, listener: ValueListener) -> u64 {
        let token = self.next_token();
        self.by_dial
            .entry(id.to_string())
            .or_default()
            .push((token, listener));
        token
    }

    pub(crate) fn add_registry(&mut self, listener: RegistryListener) -> u64 {
        let token = self.next_token();
        self.registry.push((token, listener));
        token
    }

    /// Remove a listener; returns false if it was already gone
    pub(crate) fn remove(&mut self, target: &ListenerTarget, token: u64) -> bool {
        match target {
            ListenerTarget::Dial(id) => {
                let Some(entries) = self.by_dial.get_mut(id) else {
                    return false;
                };
                let before = entries.len();
                entries.retain(|(t, _)| *t != token);
                let removed = entries.len() != before;
                if entries.is_empty() {
                    self.by_dial.remove(id);
                }
                removed
            }
            ListenerTarget::Registry => {
                let before = self.registry.len();
                self.registry.retain(|(t, _)| *t != token);
                self.registry.len() != before
            }
        }
    }

    /// Snapshot of a dial's listeners in subscription order
    pub(crate) fn dial_listeners(&self, id: &str) -> Vec<ValueListener> {
        self.by_dial
            .get(id)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn registry_listeners(&self) -> Vec<RegistryListener> {
        self.registry.iter().map(|(_, l)| l.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn dial_listener_count(&self, id: &str) -> usize {
        self.by_dial.get(id).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub(crate) fn registry_listener_count(&self) -> usize {
        self.registry.len()
    }
}
