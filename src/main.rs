//! dials - runtime-adjustable design tokens
//!
//! Lists, edits, resets, and inspects the dials declared in ~/.dials/dials.toml

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dials::commands::{self, OutputFormat};
use dials::config::{self, DialsPaths};
use dials::tui;

#[derive(Parser)]
#[command(name = "dials")]
#[command(author, version, about = "Dials - runtime-adjustable design tokens with local persistence")]
struct Cli {
    /// Persistence scope (overrides project_id from config.toml)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dials (first-time setup)
    Init,

    /// List dials by group
    List {
        /// Only show this group
        #[arg(short, long)]
        group: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a dial by ID
    Get {
        /// Dial ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set a dial's value
    Set {
        /// Dial ID
        id: String,

        /// New value (true/false, a number, a color, a length, or a variant option)
        value: String,
    },

    /// Reset a dial to its default
    Reset {
        /// Dial ID
        id: String,
    },

    /// Reset every dial to its default
    ResetAll,

    /// Print current values as JSON
    Export {
        /// Export full dial records instead of values
        #[arg(long)]
        dials: bool,
    },

    /// Remove persisted values for the current scope
    Clear,

    /// Launch the terminal inspector
    Inspect,
}

fn init_logging(verbose: bool, quiet: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Ok(filter) = EnvFilter::try_from_env("DIALS_LOG") {
        filter
    } else if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = DialsPaths::new()?;

    let log_level = config::load_config(&paths)
        .map(|c| c.log_level)
        .unwrap_or_else(|_| "info".to_string());
    // Log lines would draw over the inspector's alternate screen
    let quiet = matches!(cli.command, Commands::Inspect);
    init_logging(cli.verbose, quiet, &log_level);

    if let Commands::Init = cli.command {
        return commands::init(&paths);
    }

    let registry = commands::open_registry(&paths, cli.project.as_deref())?;

    match cli.command {
        Commands::Init => {}
        Commands::List { group, json } => {
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Summary
            };
            commands::list(&registry, group.as_deref(), format)?;
        }
        Commands::Get { id, json } => {
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Summary
            };
            commands::get(&registry, &id, format)?;
        }
        Commands::Set { id, value } => {
            commands::set(&registry, &id, &value)?;
        }
        Commands::Reset { id } => {
            commands::reset(&registry, &id)?;
        }
        Commands::ResetAll => {
            commands::reset_all(&registry)?;
        }
        Commands::Export { dials } => {
            commands::export(&registry, dials)?;
        }
        Commands::Clear => {
            commands::clear(&registry)?;
        }
        Commands::Inspect => {
            let mut app = tui::InspectorApp::new(&registry);
            app.run()?;
        }
    }

    registry.flush_notifications();

    Ok(())
}
