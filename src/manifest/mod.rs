//! Read-only design token manifest
//!
//! Color and spacing dials consult the manifest for their option lists when
//! the caller does not supply any. Parsing is lenient: a section with an
//! unexpected shape is treated as empty rather than rejecting the manifest.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Color category used when a color dial does not name one
pub const DEFAULT_COLOR_CATEGORY: &str = "accent";

/// One manifest section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSection {
    /// An ordered list, or a named mapping (values taken in enumeration order)
    pub values: Option<Value>,
    pub variables: Option<Value>,
}

impl ManifestSection {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self {
                values: map.get("values").cloned(),
                variables: map.get("variables").cloned(),
            },
            _ => Self::default(),
        }
    }
}

/// Design token manifest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub colors: ManifestSection,
    pub spacing: ManifestSection,
    pub typography: ManifestSection,
    pub border_radius: ManifestSection,
    pub shadows: ManifestSection,
}

impl Manifest {
    /// Build a manifest from parsed JSON; unknown or malformed sections are empty
    pub fn from_value(value: &Value) -> Self {
        Self {
            colors: ManifestSection::from_value(value.get("colors")),
            spacing: ManifestSection::from_value(value.get("spacing")),
            typography: ManifestSection::from_value(value.get("typography")),
            border_radius: ManifestSection::from_value(value.get("borderRadius")),
            shadows: ManifestSection::from_value(value.get("shadows")),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Failed to parse manifest JSON")?;
        Ok(Self::from_value(&value))
    }

    /// Load a manifest file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Color options for `category` (default `accent`)
    pub fn color_options(&self, category: Option<&str>) -> Vec<String> {
        let category = category.unwrap_or(DEFAULT_COLOR_CATEGORY);
        self.colors
            .values
            .as_ref()
            .and_then(|values| values.get(category))
            .map(extract_values)
            .unwrap_or_default()
    }

    /// Spacing scale options
    pub fn spacing_options(&self) -> Vec<String> {
        self.spacing
            .values
            .as_ref()
            .map(extract_values)
            .unwrap_or_default()
    }
}

/// Flatten a list or named mapping into option strings
fn extract_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(option_string).collect(),
        Value::Object(map) => map.values().filter_map(option_string).collect(),
        _ => Vec::new(),
    }
}

fn option_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // Token objects of the form {"value": "..."}
        Value::Object(map) => map.get("value").and_then(option_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_color_options_named_mapping_keeps_order() {
        let manifest = Manifest::from_value(&json!({
            "colors": {
                "values": {
                    "accent": { "primary": "#3b82f6", "danger": "#ef4444", "muted": "#94a3b8" },
                    "neutral": ["#000", "#fff"]
                }
            }
        }));

        assert_eq!(
            manifest.color_options(None),
            vec!["#3b82f6", "#ef4444", "#94a3b8"]
        );
        assert_eq!(manifest.color_options(Some("neutral")), vec!["#000", "#fff"]);
        assert!(manifest.color_options(Some("missing")).is_empty());
    }

    #[test]
    fn test_spacing_options_from_list_and_tokens() {
        let manifest = Manifest::from_value(&json!({
            "spacing": { "values": ["4px", 8, { "value": "12px" }, null] }
        }));
        assert_eq!(manifest.spacing_options(), vec!["4px", "8", "12px"]);
    }

    #[test]
    fn test_malformed_sections_are_empty() {
        let manifest = Manifest::from_value(&json!({ "colors": "oops", "spacing": { "values": 3 } }));
        assert!(manifest.color_options(None).is_empty());
        assert!(manifest.spacing_options().is_empty());
    }

    #[test]
    fn test_border_radius_section_name() {
        let manifest = Manifest::from_value(&json!({
            "borderRadius": { "values": ["2px"], "variables": { "--radius": "2px" } }
        }));
        assert!(manifest.border_radius.values.is_some());
        assert!(manifest.border_radius.variables.is_some());
    }
}
