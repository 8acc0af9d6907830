//! Loanledger CLI - Command-line interface for the loan lifecycle contract
//!
//! Provides commands for:
//! - Invoking contract functions against a local world state
//! - Inspecting loans and their audit history
//! - Replaying scripted invocations
//! - Viewing and validating configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use loanledger_core::config::{Config, LoggingConfig};

mod commands;
mod output;

use commands::{
    config::ConfigCommand,
    invoke::InvokeCommand,
    loan::{HistoryCommand, ListCommand, ShowCommand},
    replay::ReplayCommand,
    CliContext,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "loanledger",
    version,
    about = "Loan lifecycle contract on a local versioned ledger"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use alternate world state database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Invoke a contract function and commit its writes
    Invoke(InvokeCommand),
    /// Show the current record of a loan
    Show(ShowCommand),
    /// Show the audit history of a loan
    History(HistoryCommand),
    /// List loans in the world state
    List(ListCommand),
    /// Run a file of invocations in order
    Replay(ReplayCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Installs the global subscriber; `RUST_LOG` overrides everything else
fn init_tracing(verbose: u8, logging: &LoggingConfig) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);
    if let Some(db) = &cli.db {
        config.ledger.database = db.clone();
    }

    init_tracing(cli.verbose, &config.logging);

    let ctx = CliContext {
        format: OutputFormat::from_flag(cli.json),
        config,
        config_path,
    };

    let result = match cli.command {
        Commands::Invoke(cmd) => cmd.execute(&ctx).await,
        Commands::Show(cmd) => cmd.execute(&ctx).await,
        Commands::History(cmd) => cmd.execute(&ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Replay(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            get_formatter(ctx.format).error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
