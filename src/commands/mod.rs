//! CLI commands for dials

use anyhow::{bail, Context, Result};
use std::fs;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{
    load_config, load_declarations, save_config, Config, DialDeclaration, DialsPaths,
    StorageBackend, EXAMPLE_DECLARATIONS,
};
use crate::manifest::Manifest;
use crate::models::{Dial, DialConfig};
use crate::overlay::parse_input;
use crate::registry::{DialRegistry, RegistryOptions};
use crate::store::{PersistentStore, SqliteStore};
use crate::typed;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Summary,
}

/// Initialize dials for first-time setup
pub fn init(paths: &DialsPaths) -> Result<()> {
    if paths.is_initialized() {
        println!("Dials is already initialized at {}", paths.root.display());
        return Ok(());
    }

    println!("Initializing dials at {}...", paths.root.display());

    paths.ensure_dirs()?;

    save_config(paths, &Config::default())?;
    println!("  Created config.toml");

    if !paths.declarations.exists() {
        fs::write(&paths.declarations, EXAMPLE_DECLARATIONS)
            .context("Failed to write dials.toml")?;
        println!("  Created dials.toml with example dials");
    }

    SqliteStore::open(&paths.store_file).context("Failed to create store")?;
    println!("  Created store.db");

    println!();
    println!("Dials initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  dials list                 List declared dials");
    println!("  dials set <id> <value>     Change a dial");
    println!("  dials inspect              Open the terminal inspector");

    Ok(())
}

/// Build the registry described by the on-disk configuration and register
/// every declared dial
pub fn open_registry(paths: &DialsPaths, project_override: Option<&str>) -> Result<DialRegistry> {
    let config = load_config(paths)?;

    let store: Option<Arc<dyn PersistentStore>> = match config.storage.backend {
        StorageBackend::Memory => None,
        StorageBackend::Sqlite => match SqliteStore::open(&paths.store_file) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(path = %paths.store_file.display(), error = %e, "Store unavailable, dials will not persist");
                None
            }
        },
    };

    let manifest = config.manifest.as_ref().and_then(|path| match Manifest::load(path) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(error = %e, "Ignoring design token manifest");
            None
        }
    });

    let project_id = project_override
        .map(str::to_string)
        .or_else(|| config.project_id.clone());

    let registry = DialRegistry::new(RegistryOptions {
        storage_prefix: config.storage.prefix.clone(),
        storage_version: config.storage.version,
        project_id,
        store,
        manifest,
    });

    let declarations = load_declarations(&paths.declarations_for(&config))?;
    register_declarations(&registry, declarations);
    debug!(dials = registry.len(), key = %registry.storage_key(), "Registry ready");

    Ok(registry)
}

/// Register declared dials through the typed accessors
pub fn register_declarations(registry: &DialRegistry, declarations: Vec<DialDeclaration>) {
    for DialDeclaration { id, config } in declarations {
        match config {
            DialConfig::Boolean(c) => {
                typed::boolean(registry, &id, c);
            }
            DialConfig::Number(c) => {
                typed::number(registry, &id, c);
            }
            DialConfig::Color(c) => {
                typed::color(registry, &id, c);
            }
            DialConfig::Spacing(c) => {
                typed::spacing(registry, &id, c);
            }
            DialConfig::Variant(c) => {
                typed::variant(registry, &id, c);
            }
        }
    }
}

/// List dials by group
pub fn list(registry: &DialRegistry, group: Option<&str>, format: OutputFormat) -> Result<()> {
    let groups: Vec<_> = registry
        .get_dials_by_group()
        .into_iter()
        .filter(|g| group.map_or(true, |name| g.name.eq_ignore_ascii_case(name)))
        .collect();

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No dials found.");
        println!("Declare some in dials.toml, or run: dials init");
        return Ok(());
    }

    for group in groups {
        println!("{}", group.name);
        println!("{}", "-".repeat(72));
        for dial in &group.dials {
            let marker = if dial.is_default() { " " } else { "*" };
            println!(
                "{} {:<24} {:<9} {:<20} {}",
                marker,
                truncate(&dial.id, 24),
                dial.kind,
                truncate(&dial.current_value.to_string(), 20),
                dial.display_label()
            );
        }
        println!();
    }

    Ok(())
}

/// Show one dial
pub fn get(registry: &DialRegistry, id: &str, format: OutputFormat) -> Result<()> {
    let dial = registry
        .get_dial(id)
        .with_context(|| format!("Dial not found: {}", id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dial)?),
        OutputFormat::Summary => print_dial_summary(&dial),
    }

    Ok(())
}

/// Parse and set a dial's value
pub fn set(registry: &DialRegistry, id: &str, input: &str) -> Result<()> {
    let dial = registry
        .get_dial(id)
        .with_context(|| format!("Dial not found: {}", id))?;
    let value = parse_input(&dial.config, input)?;

    registry.set_value(id, value.clone());
    println!("✓ {} = {}", id, value);
    Ok(())
}

pub fn reset(registry: &DialRegistry, id: &str) -> Result<()> {
    let Some(dial) = registry.get_dial(id) else {
        bail!("Dial not found: {}", id);
    };

    registry.reset(id);
    println!("✓ {} reset to {}", id, dial.config.default_value());
    Ok(())
}

pub fn reset_all(registry: &DialRegistry) -> Result<()> {
    registry.reset_all();
    println!("✓ Reset {} dials", registry.len());
    Ok(())
}

/// Print values (or full dials) as JSON
pub fn export(registry: &DialRegistry, full: bool) -> Result<()> {
    let json = if full {
        serde_json::to_string_pretty(&registry.export_dials())?
    } else {
        serde_json::to_string_pretty(&registry.export_values())?
    };
    println!("{}", json);
    Ok(())
}

/// Remove persisted values for the current scope
pub fn clear(registry: &DialRegistry) -> Result<()> {
    if !registry.has_store() {
        println!("No persistent store configured; nothing to clear.");
        return Ok(());
    }

    registry.clear_storage();
    println!("✓ Cleared {}", registry.storage_key());
    Ok(())
}

fn print_dial_summary(dial: &Dial) {
    println!("Dial: {}", dial.id);
    println!("{}", "=".repeat(50));
    println!("Label:    {}", dial.display_label());
    println!("Kind:     {}", dial.kind);
    println!("Group:    {}", dial.config.group_or_default());
    println!("Value:    {}", dial.current_value);
    println!("Default:  {}", dial.config.default_value());

    if let Some(description) = dial.config.description() {
        println!("About:    {}", description);
    }

    match &dial.config {
        DialConfig::Number(c) => {
            if c.min.is_some() || c.max.is_some() {
                println!(
                    "Range:    {} .. {}",
                    c.min.map_or("-".to_string(), |v| v.to_string()),
                    c.max.map_or("-".to_string(), |v| v.to_string())
                );
            }
            if let Some(unit) = &c.unit {
                println!("Unit:     {}", unit);
            }
        }
        DialConfig::Spacing(c) => {
            if let Some(unit) = &c.unit {
                println!("Unit:     {}", unit);
            }
        }
        DialConfig::Boolean(_) | DialConfig::Color(_) | DialConfig::Variant(_) => {}
    }

    let options = dial.config.options();
    if !options.is_empty() {
        println!("Options:  {}", options.join(", "));
    }

    println!();
    println!("Updated:  {}", format_timestamp(dial.updated_at));
}

fn format_timestamp(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
