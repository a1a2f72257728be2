//! Data models for dials
//!
//! A dial is a named, typed, runtime-adjustable value. Its configuration is a
//! sum type over the five dial kinds; its current value is stored untyped so
//! that it round-trips through the persisted JSON record unchanged.

use serde::{Deserialize, Serialize};

/// Group name used for dials declared without a `group`
pub const UNGROUPED: &str = "Ungrouped";

/// The kind of a dial
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DialKind {
    Boolean,
    Number,
    Color,
    Spacing,
    Variant,
}

impl std::fmt::Display for DialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialKind::Boolean => write!(f, "boolean"),
            DialKind::Number => write!(f, "number"),
            DialKind::Color => write!(f, "color"),
            DialKind::Spacing => write!(f, "spacing"),
            DialKind::Variant => write!(f, "variant"),
        }
    }
}

impl std::str::FromStr for DialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(DialKind::Boolean),
            "number" => Ok(DialKind::Number),
            "color" => Ok(DialKind::Color),
            "spacing" => Ok(DialKind::Spacing),
            "variant" => Ok(DialKind::Variant),
            _ => Err(format!(
                "Invalid dial kind: {}. Use: boolean, number, color, spacing, variant",
                s
            )),
        }
    }
}

/// A dial's value as stored and persisted
///
/// The registry does not check that a value matches its dial's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl DialValue {
    /// Convert a raw JSON value, if it has a representable shape
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(DialValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(DialValue::Number),
            serde_json::Value::String(s) => Some(DialValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DialValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DialValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DialValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for DialValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialValue::Bool(b) => write!(f, "{}", b),
            DialValue::Number(n) => write!(f, "{}", n),
            DialValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for DialValue {
    fn from(value: bool) -> Self {
        DialValue::Bool(value)
    }
}

impl From<f64> for DialValue {
    fn from(value: f64) -> Self {
        DialValue::Number(value)
    }
}

impl From<i32> for DialValue {
    fn from(value: i32) -> Self {
        DialValue::Number(f64::from(value))
    }
}

impl From<&str> for DialValue {
    fn from(value: &str) -> Self {
        DialValue::Text(value.to_string())
    }
}

impl From<String> for DialValue {
    fn from(value: String) -> Self {
        DialValue::Text(value)
    }
}

/// Configuration for an on/off dial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanConfig {
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl BooleanConfig {
    pub fn new(default: bool) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }
}

/// Configuration for a numeric dial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberConfig {
    pub default: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl NumberConfig {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }
}

/// Configuration for a color dial
///
/// When `options` is empty the typed accessor fills it from the manifest's
/// color section, using `category` (or `accent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_allow_custom")]
    pub allow_custom: bool,
}

fn default_allow_custom() -> bool {
    true
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            default: String::new(),
            label: None,
            description: None,
            group: None,
            options: Vec::new(),
            category: None,
            allow_custom: true,
        }
    }
}

impl ColorConfig {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            ..Self::default()
        }
    }
}

/// Configuration for a spacing dial (CSS-like lengths such as `"8px"`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacingConfig {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl SpacingConfig {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            ..Self::default()
        }
    }
}

/// Configuration for a dial that picks one of a fixed set of options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub options: Vec<String>,
}

impl VariantConfig {
    pub fn new(default: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            default: default.into(),
            options,
            ..Self::default()
        }
    }
}

/// Kind-specific dial configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DialConfig {
    Boolean(BooleanConfig),
    Number(NumberConfig),
    Color(ColorConfig),
    Spacing(SpacingConfig),
    Variant(VariantConfig),
}

impl DialConfig {
    pub fn kind(&self) -> DialKind {
        match self {
            DialConfig::Boolean(_) => DialKind::Boolean,
            DialConfig::Number(_) => DialKind::Number,
            DialConfig::Color(_) => DialKind::Color,
            DialConfig::Spacing(_) => DialKind::Spacing,
            DialConfig::Variant(_) => DialKind::Variant,
        }
    }

    pub fn default_value(&self) -> DialValue {
        match self {
            DialConfig::Boolean(c) => DialValue::Bool(c.default),
            DialConfig::Number(c) => DialValue::Number(c.default),
            DialConfig::Color(c) => DialValue::Text(c.default.clone()),
            DialConfig::Spacing(c) => DialValue::Text(c.default.clone()),
            DialConfig::Variant(c) => DialValue::Text(c.default.clone()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            DialConfig::Boolean(c) => c.label.as_deref(),
            DialConfig::Number(c) => c.label.as_deref(),
            DialConfig::Color(c) => c.label.as_deref(),
            DialConfig::Spacing(c) => c.label.as_deref(),
            DialConfig::Variant(c) => c.label.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            DialConfig::Boolean(c) => c.description.as_deref(),
            DialConfig::Number(c) => c.description.as_deref(),
            DialConfig::Color(c) => c.description.as_deref(),
            DialConfig::Spacing(c) => c.description.as_deref(),
            DialConfig::Variant(c) => c.description.as_deref(),
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            DialConfig::Boolean(c) => c.group.as_deref(),
            DialConfig::Number(c) => c.group.as_deref(),
            DialConfig::Color(c) => c.group.as_deref(),
            DialConfig::Spacing(c) => c.group.as_deref(),
            DialConfig::Variant(c) => c.group.as_deref(),
        }
    }

    /// Group name used for display and grouping
    pub fn group_or_default(&self) -> &str {
        self.group().unwrap_or(UNGROUPED)
    }

    /// Declared option list (empty for kinds without options)
    pub fn options(&self) -> &[String] {
        match self {
            DialConfig::Boolean(_) | DialConfig::Number(_) => &[],
            DialConfig::Color(c) => &c.options,
            DialConfig::Spacing(c) => &c.options,
            DialConfig::Variant(c) => &c.options,
        }
    }
}

impl From<BooleanConfig> for DialConfig {
    fn from(config: BooleanConfig) -> Self {
        DialConfig::Boolean(config)
    }
}

impl From<NumberConfig> for DialConfig {
    fn from(config: NumberConfig) -> Self {
        DialConfig::Number(config)
    }
}

impl From<ColorConfig> for DialConfig {
    fn from(config: ColorConfig) -> Self {
        DialConfig::Color(config)
    }
}

impl From<SpacingConfig> for DialConfig {
    fn from(config: SpacingConfig) -> Self {
        DialConfig::Spacing(config)
    }
}

impl From<VariantConfig> for DialConfig {
    fn from(config: VariantConfig) -> Self {
        DialConfig::Variant(config)
    }
}

/// A registered dial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dial {
    pub id: String,
    pub kind: DialKind,
    pub config: DialConfig,
    pub current_value: DialValue,
    /// Unix timestamp in milliseconds of the last registration or change
    pub updated_at: i64,
}

impl Dial {
    /// Label for display, falling back to the id
    pub fn display_label(&self) -> &str {
        self.config.label().unwrap_or(&self.id)
    }

    pub fn is_default(&self) -> bool {
        self.current_value == self.config.default_value()
    }
}

/// Dials sharing a `group`, in registration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialGroup {
    pub name: String,
    pub dials: Vec<Dial>,
}
