//! Berth CLI
//!
//! Command-line interface for the Berth launcher settings store.
//!
//! The store is opened on the main thread, which stays its only owner.
//! Flushes run on a tokio runtime created here; the process drains it
//! before exiting.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use berth_core::{Config, DataError, DataStore};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Berth - inspect and edit launcher settings")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output from the settings store
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all variables and their values
    Vars,
    /// Print one variable
    Get {
        /// Variable name, e.g. MultiAccounts
        name: String,
    },
    /// Set one variable
    Set {
        /// Variable name, e.g. MultiAccounts
        name: String,
        /// New value, parsed as the variable's type
        value: String,
    },
    /// Manage favorite servers
    Favorites {
        #[command(subcommand)]
        command: Option<FavoriteCommands>,
    },
    /// Manage stored logins
    Logins {
        #[command(subcommand)]
        command: Option<LoginCommands>,
    },
    /// Installed server content
    Content {
        #[command(subcommand)]
        command: Option<ListCommands>,
    },
    /// Installed engine versions
    Engines {
        #[command(subcommand)]
        command: Option<ListCommands>,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// List favorite servers
    #[command(alias = "ls")]
    List,
    /// Add a favorite server
    Add {
        /// Server address
        address: String,
        /// Display name
        name: String,
    },
    /// Rename a favorite server
    Rename {
        /// Server address
        address: String,
        /// New display name
        name: String,
    },
    /// Remove a favorite server
    #[command(alias = "rm")]
    Remove {
        /// Server address
        address: String,
    },
}

#[derive(Subcommand)]
enum LoginCommands {
    /// List stored logins
    #[command(alias = "ls")]
    List,
    /// Select the active login
    Select {
        /// User ID (full UUID or prefix)
        id: String,
    },
    /// Clear the active login
    Deselect,
    /// Forget a stored login
    #[command(alias = "rm")]
    Remove {
        /// User ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// List entries
    #[command(alias = "ls")]
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    // Doesn't need the store
    if let Commands::Config = cli.command {
        return commands::config::show(&config, cli.config.as_deref(), &output);
    }

    let runtime = Runtime::new().context("Failed to start background runtime")?;
    let mut store = DataStore::open(config, runtime.handle().clone())
        .map_err(with_hint)
        .context("Failed to open settings store")?;

    let result = run(cli.command, &mut store, &output);

    // Everything committed above must reach disk before we exit
    store.close();

    result.map_err(|e| match e.downcast::<DataError>() {
        Ok(data_err) => with_hint(data_err),
        Err(e) => e,
    })
}

fn run(command: Commands, store: &mut DataStore, output: &Output) -> Result<()> {
    match command {
        Commands::Vars => commands::vars::list(store, output),
        Commands::Get { name } => commands::vars::get(store, name, output),
        Commands::Set { name, value } => commands::vars::set(store, name, value, output),
        Commands::Favorites { command } => handle_favorite_command(command, store, output),
        Commands::Logins { command } => handle_login_command(command, store, output),
        Commands::Content { .. } => commands::installs::list_content(store, output),
        Commands::Engines { .. } => commands::installs::list_engines(store, output),
        Commands::Config => unreachable!(), // Handled before the store opens
    }
}

fn handle_favorite_command(
    command: Option<FavoriteCommands>,
    store: &mut DataStore,
    output: &Output,
) -> Result<()> {
    match command {
        Some(FavoriteCommands::List) | None => commands::favorites::list(store, output),
        Some(FavoriteCommands::Add { address, name }) => {
            commands::favorites::add(store, address, name, output)
        }
        Some(FavoriteCommands::Rename { address, name }) => {
            commands::favorites::rename(store, address, name, output)
        }
        Some(FavoriteCommands::Remove { address }) => {
            commands::favorites::remove(store, address, output)
        }
    }
}

fn handle_login_command(
    command: Option<LoginCommands>,
    store: &mut DataStore,
    output: &Output,
) -> Result<()> {
    match command {
        Some(LoginCommands::List) | None => commands::logins::list(store, output),
        Some(LoginCommands::Select { id }) => commands::logins::select(store, id, output),
        Some(LoginCommands::Deselect) => commands::logins::deselect(store, output),
        Some(LoginCommands::Remove { id }) => commands::logins::remove(store, id, output),
    }
}

/// Attach the error's recovery suggestion, if it has one
///
/// Fatal errors are also logged, so a configured log file records why the
/// store could not be used.
fn with_hint(err: DataError) -> anyhow::Error {
    if err.is_fatal() {
        error!(error = %err, "Settings store unusable");
    }
    match err.recovery_suggestion() {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}

/// Initialize logging
///
/// Level comes from BERTH_LOG, else `debug` with --verbose and `warn`
/// otherwise. Logs go to config.log_file when set, stderr otherwise.
fn init_logging(config: &Config, verbose: bool) {
    let log_level = std::env::var("BERTH_LOG")
        .unwrap_or_else(|_| if verbose { "debug" } else { "warn" }.to_string());
    let env_filter = EnvFilter::new(format!(
        "berth_core={},berth_cli={}",
        log_level, log_level
    ));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match &config.log_file {
        Some(log_path) => match File::create(log_path) {
            Ok(log_file) => {
                let _ = builder.with_ansi(false).with_writer(log_file).try_init();
                info!("Logging initialized to {:?}", log_path);
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_favorites_rename() {
        let cli = Cli::try_parse_from([
            "berth",
            "--json",
            "favorites",
            "rename",
            "game.example:1212",
            "B",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Favorites {
                command: Some(FavoriteCommands::Rename { .. })
            }
        ));
    }

    #[test]
    fn test_logins_defaults_to_list() {
        let cli = Cli::try_parse_from(["berth", "logins"]).unwrap();
        assert!(matches!(cli.command, Commands::Logins { command: None }));
    }

    #[test]
    fn test_hint_is_attached() {
        let err = with_hint(DataError::DanglingSelectionReference {
            user_id: uuid::Uuid::nil(),
        });
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("Log in with that account"));
        assert!(rendered.contains("no such login"));
    }

    #[test]
    fn test_fatal_error_keeps_its_hint() {
        let err = with_hint(DataError::MigrationFailed {
            script: "0004_login_server".to_string(),
            source: rusqlite::Error::InvalidQuery,
        });
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("Move settings.db aside"));
        assert!(rendered.contains("0004_login_server"));
    }
}
