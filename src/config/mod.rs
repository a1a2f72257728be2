//! Configuration management for dials
//!
//! Handles the ~/.dials/ directory structure, config.toml, and the dial
//! declarations file the CLI registers at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::DialConfig;
use crate::store::{DEFAULT_STORAGE_PREFIX, STORAGE_VERSION};

/// Where dial values are persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

fn default_version() -> u32 {
    STORAGE_VERSION
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            prefix: default_prefix(),
            version: default_version(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Persistence scope, e.g. a project id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Design token manifest (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Dial declarations (TOML); defaults to ~/.dials/dials.toml
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declarations: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            manifest: None,
            declarations: None,
            log_level: default_log_level(),
            storage: StorageConfig::default(),
        }
    }
}

/// Returns the path to the dials home directory (~/.dials)
pub fn dials_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".dials"))
}

/// Returns paths to all dials files
#[derive(Debug, Clone)]
pub struct DialsPaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub declarations: PathBuf,
    pub store_file: PathBuf,
}

impl DialsPaths {
    pub fn new() -> Result<Self> {
        Ok(Self::at(dials_home()?))
    }

    /// Paths rooted at an arbitrary directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: root.join("config.toml"),
            declarations: root.join("dials.toml"),
            store_file: root.join("store.db"),
            root,
        }
    }

    /// Create the root directory if it doesn't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create dials root")?;
        Ok(())
    }

    /// Check if dials has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists()
    }

    /// Declarations file named by `config`, or the default one
    pub fn declarations_for(&self, config: &Config) -> PathBuf {
        config
            .declarations
            .clone()
            .unwrap_or_else(|| self.declarations.clone())
    }
}

/// Load configuration from disk, falling back to defaults if absent
pub fn load_config(paths: &DialsPaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &DialsPaths, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}

/// A dial declared in the declarations file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialDeclaration {
    pub id: String,
    #[serde(flatten)]
    pub config: DialConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeclarationsFile {
    #[serde(default, rename = "dial")]
    dials: Vec<DialDeclaration>,
}

pub fn parse_declarations(content: &str) -> Result<Vec<DialDeclaration>> {
    let file: DeclarationsFile =
        toml::from_str(content).context("Failed to parse dial declarations")?;
    Ok(file.dials)
}

/// Load declarations; a missing file declares nothing
pub fn load_declarations(path: &Path) -> Result<Vec<DialDeclaration>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_declarations(&content)
}

/// Example declarations written by `dials init`
pub const EXAMPLE_DECLARATIONS: &str = r##"# Dials registered by the CLI and inspector.
# Each [[dial]] needs an id and a kind: boolean, number, color, spacing, variant.

[[dial]]
id = "card-shadow"
kind = "boolean"
default = true
label = "Card shadow"
group = "Cards"

[[dial]]
id = "card-opacity"
kind = "number"
default = 0.9
min = 0.0
max = 1.0
step = 0.05
label = "Card opacity"
group = "Cards"

[[dial]]
id = "accent-color"
kind = "color"
default = "#3b82f6"
label = "Accent"
group = "Theme"

[[dial]]
id = "grid-gap"
kind = "spacing"
default = "16px"
label = "Grid gap"
group = "Layout"

[[dial]]
id = "chart-style"
kind = "variant"
default = "line"
options = ["line", "area", "bar"]
label = "Chart style"
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DialKind;
    use tempfile::TempDir;

    #[test]
    fn test_example_declarations_parse() {
        let dials = parse_declarations(EXAMPLE_DECLARATIONS).unwrap();
        let kinds: Vec<DialKind> = dials.iter().map(|d| d.config.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                DialKind::Boolean,
                DialKind::Number,
                DialKind::Color,
                DialKind::Spacing,
                DialKind::Variant
            ]
        );
        assert_eq!(dials[4].config.options(), ["line", "area", "bar"]);
    }

    #[test]
    fn test_config_roundtrip_and_defaults() {
        let temp = TempDir::new().unwrap();
        let paths = DialsPaths::at(temp.path());

        let config = load_config(&paths).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage.prefix, "dials");

        let mut config = Config::default();
        config.project_id = Some("dashboard".to_string());
        config.storage.backend = StorageBackend::Memory;
        save_config(&paths, &config).unwrap();

        assert_eq!(load_config(&paths).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("project_id = \"p\"\n[storage]\nversion = 3\n").unwrap();
        assert_eq!(config.storage.version, 3);
        assert_eq!(config.storage.prefix, "dials");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_declarations_file() {
        let temp = TempDir::new().unwrap();
        let dials = load_declarations(&temp.path().join("nope.toml")).unwrap();
        assert!(dials.is_empty());
    }
}
