//! Typed dial accessors
//!
//! One function per dial kind. Each registers the dial (a no-op after the
//! first call) and returns the live value as a concrete type, so they are
//! safe to call on every render. Color and spacing accessors fill in their
//! option list from the registry's manifest when the caller gives none.
//!
//! `DialMount` adds the subscribe-once / clean-up-on-unmount binding for a
//! UI unit that wants to be re-rendered when its dials change.

use std::collections::HashMap;
use std::sync::Arc;

use crate::manifest::Manifest;
use crate::models::{
    BooleanConfig, ColorConfig, DialValue, NumberConfig, SpacingConfig, VariantConfig,
};
use crate::registry::{DialRegistry, Subscription, ValueListener};

pub fn boolean(registry: &DialRegistry, id: &str, config: BooleanConfig) -> bool {
    let default = config.default;
    registry.register(id, config).as_bool().unwrap_or(default)
}

pub fn number(registry: &DialRegistry, id: &str, config: NumberConfig) -> f64 {
    let default = config.default;
    registry.register(id, config).as_f64().unwrap_or(default)
}

pub fn color(registry: &DialRegistry, id: &str, config: ColorConfig) -> String {
    let config = with_color_options(registry.manifest(), config);
    let default = config.default.clone();
    text_or(registry.register(id, config), default)
}

pub fn spacing(registry: &DialRegistry, id: &str, config: SpacingConfig) -> String {
    let config = with_spacing_options(registry.manifest(), config);
    let default = config.default.clone();
    text_or(registry.register(id, config), default)
}

pub fn variant(registry: &DialRegistry, id: &str, config: VariantConfig) -> String {
    let default = config.default.clone();
    text_or(registry.register(id, config), default)
}

/// Fill empty color options from the manifest's category (default `accent`)
pub fn with_color_options(manifest: Option<&Manifest>, mut config: ColorConfig) -> ColorConfig {
    if config.options.is_empty() {
        if let Some(manifest) = manifest {
            config.options = manifest.color_options(config.category.as_deref());
        }
    }
    config
}

/// Fill empty spacing options from the manifest's spacing scale
pub fn with_spacing_options(
    manifest: Option<&Manifest>,
    mut config: SpacingConfig,
) -> SpacingConfig {
    if config.options.is_empty() {
        if let Some(manifest) = manifest {
            config.options = manifest.spacing_options();
        }
    }
    config
}

fn text_or(value: DialValue, default: String) -> String {
    match value {
        DialValue::Text(s) => s,
        _ => default,
    }
}

/// Dial bindings of one mounted UI unit
///
/// The accessors may be called on every render; each dial is subscribed at
/// most once. Dropping the mount (or calling `unmount`) removes every
/// subscription.
pub struct DialMount {
    registry: DialRegistry,
    on_change: ValueListener,
    subscriptions: HashMap<String, Subscription>,
}

impl DialMount {
    /// `on_change` runs synchronously whenever one of the mount's dials is set
    pub fn new<F>(registry: &DialRegistry, on_change: F) -> Self
    where
        F: Fn(&str, &DialValue) + Send + Sync + 'static,
    {
        Self {
            registry: registry.clone(),
            on_change: Arc::new(on_change),
            subscriptions: HashMap::new(),
        }
    }

    pub fn boolean(&mut self, id: &str, config: BooleanConfig) -> bool {
        let value = boolean(&self.registry, id, config);
        self.bind(id);
        value
    }

    pub fn number(&mut self, id: &str, config: NumberConfig) -> f64 {
        let value = number(&self.registry, id, config);
        self.bind(id);
        value
    }

    pub fn color(&mut self, id: &str, config: ColorConfig) -> String {
        let value = color(&self.registry, id, config);
        self.bind(id);
        value
    }

    pub fn spacing(&mut self, id: &str, config: SpacingConfig) -> String {
        let value = spacing(&self.registry, id, config);
        self.bind(id);
        value
    }

    pub fn variant(&mut self, id: &str, config: VariantConfig) -> String {
        let value = variant(&self.registry, id, config);
        self.bind(id);
        value
    }

    /// Ids this mount is subscribed to
    pub fn bound_ids(&self) -> Vec<&str> {
        self.subscriptions.keys().map(String::as_str).collect()
    }

    pub fn unmount(self) {}

    fn bind(&mut self, id: &str) {
        if self.subscriptions.contains_key(id) {
            return;
        }
        let on_change = self.on_change.clone();
        let subscription = self
            .registry
            .subscribe(id, move |id, value| on_change(id, value));
        self.subscriptions.insert(id.to_string(), subscription);
    }
}

impl Drop for DialMount {
    fn drop(&mut self) {
        for (_, subscription) in self.subscriptions.drain() {
            subscription.unsubscribe();
        }
    }
}
