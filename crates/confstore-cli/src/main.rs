use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use confstore_core::backend::SqliteBackend;
use confstore_core::{ConfigStore, ConfigValue, StoreSettings};

/// Confstore CLI - inspect and edit a SQLite-backed configuration store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file (overrides the settings file)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one setting, or a whole component when no name is given
    Get {
        component: String,
        name: Option<String>,

        /// Value printed when the setting is missing (JSON or plain text)
        #[arg(long)]
        fallback: Option<String>,
    },

    /// Set and persist a setting
    Set {
        component: String,
        name: String,

        /// JSON value; anything that is not JSON is stored as a string
        value: String,
    },

    /// Print all settings, or those of one component
    List { component: Option<String> },

    /// List component names
    Components,
}

/// Parse user input as JSON, keeping it as a string otherwise
fn parse_value(raw: &str) -> ConfigValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(ConfigValue::from)
        .unwrap_or_else(|_| ConfigValue::String(raw.to_string()))
}

fn render(value: ConfigValue) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&serde_json::Value::from(value))?)
}

fn settings_for(cli: &Cli) -> anyhow::Result<StoreSettings> {
    let settings = match &cli.config {
        Some(path) => StoreSettings::from_file(path)?,
        None => StoreSettings::default(),
    };
    Ok(match &cli.db {
        Some(db) => settings.with_database(db),
        None => settings,
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = settings_for(&cli)?;
    tracing::debug!("Opening config database {}", settings.database.display());

    let backend = SqliteBackend::open_with(&settings)
        .with_context(|| format!("Cannot open {}", settings.database.display()))?;
    let mut store = ConfigStore::with_backend(Arc::new(backend));
    let loaded = store.load_from_backend()?;
    tracing::debug!("{} settings loaded", loaded);

    match cli.command {
        Commands::Get {
            component,
            name,
            fallback,
        } => {
            let fallback = fallback.as_deref().map_or(ConfigValue::Null, parse_value);
            let value = store.lookup(&component, name.as_deref(), fallback);
            println!("{}", render(value)?);
        }
        Commands::Set {
            component,
            name,
            value,
        } => {
            let value = parse_value(&value);
            tracing::info!("Setting {}.{} ({})", component, name, value.type_name());
            store.set(&component, &name, value)?;
        }
        Commands::List { component } => {
            let value = match component {
                Some(component) => store.lookup(&component, None, ConfigValue::Null),
                None => {
                    let mut names: Vec<String> = store.components().map(str::to_string).collect();
                    names.sort();
                    let all = names
                        .into_iter()
                        .map(|name| {
                            let settings = store.lookup(&name, None, ConfigValue::Null);
                            (name, settings)
                        })
                        .collect();
                    ConfigValue::Map(all)
                }
            };
            println!("{}", render(value)?);
        }
        Commands::Components => {
            let mut names: Vec<&str> = store.components().collect();
            names.sort_unstable();
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();

    run(cli)
}
