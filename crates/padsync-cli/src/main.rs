//! padsync CLI
//!
//! Command-line client that keeps a notepad note in sync.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use padsync_core::Config;

mod commands;
mod output;
mod presenter;

use commands::edit::EditOptions;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "padsync")]
#[command(about = "padsync - keep a notepad note in sync from the terminal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured server URL
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append stdin to a note, saving as you go
    Edit {
        /// Note path (`abc12`) or full page URL
        target: String,
        /// Keep the last synced content in this file
        #[arg(long)]
        view: Option<PathBuf>,
        /// Never let remote updates replace local text
        #[arg(long)]
        hold_remote: bool,
    },
    /// Print a note and every update pushed by the server
    Watch {
        /// Note path (`abc12`) or full page URL
        target: String,
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
        /// Configuration key (server_url, save_delay_ms, flush_on_newline, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands manage the file itself
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    init_logging(&config);

    match cli.command {
        Commands::Edit {
            target,
            view,
            hold_remote,
        } => {
            let options = EditOptions { view, hold_remote };
            commands::edit::edit(&target, &config, options, &output).await
        }
        Commands::Watch { target } => commands::watch::watch(&target, &config, &output).await,
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

/// Initialize logging
///
/// Only initializes if PADSYNC_LOG environment variable is set (e.g.
/// `PADSYNC_LOG=debug`). Logs go to `config.log_file` when set, otherwise to
/// stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("PADSYNC_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "padsync_core={},padsync_cli={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
