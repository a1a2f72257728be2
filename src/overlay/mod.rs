//! Headless dial overlay
//!
//! Keeps a searchable, grouped view of the registry for an inspector UI and
//! turns user input into `set_value`/`reset` calls. The overlay's own
//! visibility is persisted separately from dial values, under
//! `<prefix>-overlay`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::models::{Dial, DialConfig, DialGroup, DialValue};
use crate::registry::{group_dials, DialRegistry, Subscription};

/// How much of the overlay is shown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Open,
    Collapsed,
    Hidden,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Open => write!(f, "open"),
            Visibility::Collapsed => write!(f, "collapsed"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Visibility::Open),
            "collapsed" => Ok(Visibility::Collapsed),
            "hidden" => Ok(Visibility::Hidden),
            _ => Err(format!(
                "Invalid visibility: {}. Use: open, collapsed, hidden",
                s
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OverlayState {
    visibility: Visibility,
}

/// Rejected overlay edit
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EditError {
    #[error("Unknown dial: {0}")]
    UnknownDial(String),

    #[error("Invalid boolean: {0}. Use: true, false, on, off, yes, no, 1, 0")]
    InvalidBoolean(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("{value} is outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("{value} is not one of: {}", .options.join(", "))]
    NotAnOption { value: String, options: Vec<String> },

    #[error("Empty value")]
    Empty,
}

/// Parse user input into a value for a dial with `config`
pub fn parse_input(config: &DialConfig, input: &str) -> Result<DialValue, EditError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(EditError::Empty);
    }

    match config {
        DialConfig::Boolean(_) => match input.to_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(DialValue::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(DialValue::Bool(false)),
            _ => Err(EditError::InvalidBoolean(input.to_string())),
        },
        DialConfig::Number(c) => {
            let value: f64 = input
                .parse()
                .map_err(|_| EditError::InvalidNumber(input.to_string()))?;
            if !value.is_finite() {
                return Err(EditError::InvalidNumber(input.to_string()));
            }
            let min = c.min.unwrap_or(f64::NEG_INFINITY);
            let max = c.max.unwrap_or(f64::INFINITY);
            if value < min || value > max {
                return Err(EditError::OutOfRange { value, min, max });
            }
            Ok(DialValue::Number(value))
        }
        DialConfig::Color(c) => {
            if !c.allow_custom && !c.options.is_empty() && !c.options.iter().any(|o| o == input) {
                return Err(EditError::NotAnOption {
                    value: input.to_string(),
                    options: c.options.clone(),
                });
            }
            Ok(DialValue::Text(input.to_string()))
        }
        DialConfig::Spacing(_) => Ok(DialValue::Text(input.to_string())),
        DialConfig::Variant(c) => {
            if !c.options.iter().any(|o| o == input) {
                return Err(EditError::NotAnOption {
                    value: input.to_string(),
                    options: c.options.clone(),
                });
            }
            Ok(DialValue::Text(input.to_string()))
        }
    }
}

/// Case-insensitive match on id, label, and group
pub fn matches_query(dial: &Dial, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    dial.id.to_lowercase().contains(&query)
        || dial
            .config
            .label()
            .is_some_and(|l| l.to_lowercase().contains(&query))
        || dial
            .config
            .group_or_default()
            .to_lowercase()
            .contains(&query)
}

/// Overlay state bound to a registry
pub struct Overlay {
    registry: DialRegistry,
    visibility: Visibility,
    query: String,
    groups: Vec<DialGroup>,
    stale: Arc<AtomicBool>,
    subscription: Option<Subscription>,
}

impl Overlay {
    /// Bind to `registry`, restoring the persisted visibility
    pub fn new(registry: &DialRegistry) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = stale.clone();
        let subscription = registry.subscribe_to_registry(move || {
            flag.store(true, Ordering::SeqCst);
        });

        let mut overlay = Self {
            registry: registry.clone(),
            visibility: Visibility::default(),
            query: String::new(),
            groups: Vec::new(),
            stale,
            subscription: Some(subscription),
        };
        overlay.visibility = overlay.load_visibility();
        overlay.refresh();
        overlay
    }

    pub fn registry(&self) -> &DialRegistry {
        &self.registry
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.save_visibility();
    }

    /// Open ↔ collapsed; a hidden overlay opens
    pub fn toggle_collapsed(&mut self) {
        let next = match self.visibility {
            Visibility::Open => Visibility::Collapsed,
            Visibility::Collapsed | Visibility::Hidden => Visibility::Open,
        };
        self.set_visibility(next);
    }

    /// Hide, or bring a hidden overlay back open
    pub fn toggle_hidden(&mut self) {
        let next = match self.visibility {
            Visibility::Hidden => Visibility::Open,
            Visibility::Open | Visibility::Collapsed => Visibility::Hidden,
        };
        self.set_visibility(next);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.stale.store(true, Ordering::SeqCst);
        self.refresh();
    }

    /// True once a registry notification arrived since the last refresh
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Rebuild the grouped list if it is stale; returns whether it rebuilt
    pub fn refresh(&mut self) -> bool {
        if !self.stale.swap(false, Ordering::SeqCst) {
            return false;
        }

        let dials = self
            .registry
            .get_all_dials()
            .into_iter()
            .filter(|d| matches_query(d, &self.query))
            .collect();
        self.groups = group_dials(dials);
        true
    }

    /// Filtered dials, grouped
    pub fn groups(&self) -> &[DialGroup] {
        &self.groups
    }

    /// Filtered dials in display order
    pub fn visible_dials(&self) -> Vec<&Dial> {
        self.groups.iter().flat_map(|g| g.dials.iter()).collect()
    }

    /// Parse `input` for dial `id` and apply it
    pub fn edit(&self, id: &str, input: &str) -> Result<DialValue, EditError> {
        let dial = self
            .registry
            .get_dial(id)
            .ok_or_else(|| EditError::UnknownDial(id.to_string()))?;
        let value = parse_input(&dial.config, input)?;
        self.registry.set_value(id, value.clone());
        Ok(value)
    }

    pub fn reset(&self, id: &str) {
        self.registry.reset(id);
    }

    pub fn reset_all(&self) {
        self.registry.reset_all();
    }

    fn state_key(&self) -> String {
        format!("{}-overlay", self.registry.storage_prefix())
    }

    fn load_visibility(&self) -> Visibility {
        let Some(store) = self.registry.store() else {
            return Visibility::default();
        };
        let key = self.state_key();

        match store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<OverlayState>(&raw) {
                Ok(state) => state.visibility,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to parse overlay state");
                    Visibility::default()
                }
            },
            Ok(None) => Visibility::default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read overlay state");
                Visibility::default()
            }
        }
    }

    fn save_visibility(&self) {
        let Some(store) = self.registry.store() else {
            return;
        };
        let key = self.state_key();
        let state = OverlayState {
            visibility: self.visibility,
        };

        let result = serde_json::to_string(&state)
            .map_err(crate::store::StoreError::from)
            .and_then(|raw| store.set(&key, &raw));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist overlay state");
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
