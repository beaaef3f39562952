//! postlist CLI
//!
//! Command-line client for JSON list endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use postlist_core::{Config, FileSession, ListStore, SessionDelegate};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "postlist")]
#[command(about = "postlist - keep a local list in sync with a JSON endpoint")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log requests and status changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Endpoint URL (overrides default_url from config)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Use an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the list
    #[command(alias = "ls")]
    Get {
        /// Drop local data before fetching
        #[arg(long)]
        overwrite: bool,
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Create or update records from a JSON object or array
    #[command(alias = "add")]
    Post {
        /// Record(s) as JSON
        json: String,
    },
    /// Delete records given as a JSON object or array
    #[command(alias = "rm")]
    Delete {
        /// Record(s) as JSON
        json: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (default_url, data_dir, timeout_secs, history_limit, capture_history_data)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need a store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = load_config(cli.config.as_ref())?;
    let store = open_store(&config, cli.url.as_deref())?;

    match cli.command {
        Commands::Get { overwrite, pages } => {
            commands::list::get(&store, overwrite, pages, &output).await
        }
        Commands::Post { json } => commands::list::post(&store, &json, &output).await,
        Commands::Delete { json } => commands::list::delete(&store, &json, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Load config from the CLI-specified path, or the default location
pub(crate) fn load_config(config_path: Option<&PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")
}

/// Build a store for the endpoint, persisting session fragments to the data dir
fn open_store(config: &Config, url: Option<&str>) -> Result<ListStore> {
    let url = url
        .map(str::to_string)
        .or_else(|| config.default_url.clone())
        .context(
            "No endpoint URL. Pass --url or run:\n  postlist config set default_url <url>",
        )?;

    config.ensure_data_dir()?;
    let session: Arc<dyn SessionDelegate> = Arc::new(FileSession::new(config.session_path()));

    Ok(ListStore::builder(url)
        .config(config)
        .session(session)
        .build())
}

/// Log to stderr; RUST_LOG wins over --verbose
fn init_logging(verbose: bool) {
    let default = if verbose {
        "postlist_core=debug,postlist=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
