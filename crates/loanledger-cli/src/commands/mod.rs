//! CLI subcommands
//!
//! Every command receives a [`CliContext`] carrying the resolved
//! configuration and output format.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use loanledger_core::config::Config;
use loanledger_state::{DatabasePool, Ledger, SqliteVersionedStore, StateError};

use crate::output::OutputFormat;

pub mod config;
pub mod invoke;
pub mod loan;
pub mod replay;

/// State shared by all commands for one run
pub struct CliContext {
    pub format: OutputFormat,
    pub config: Config,
    pub config_path: PathBuf,
}

impl CliContext {
    /// Opens the configured SQLite world state
    pub async fn open_ledger(&self) -> Result<Ledger> {
        let pool = DatabasePool::from_config(&self.config.ledger)
            .await
            .with_context(|| {
                format!(
                    "Failed to open world state at {}",
                    self.config.ledger.database.display()
                )
            })?;
        Ok(Ledger::new(Arc::new(SqliteVersionedStore::new(
            pool.pool().clone(),
        ))))
    }
}

/// Converts a failed invocation into a user-facing error
///
/// Contract failures carry their kind code so scripts can tell a missing
/// loan from a bad argument.
pub fn invocation_error(function: &str, e: StateError) -> anyhow::Error {
    match e {
        StateError::Contract(err) => anyhow::anyhow!("{function} failed [{}]: {err}", err.kind()),
        StateError::MvccReadConflict { .. } => {
            anyhow::anyhow!("{function} was not committed, resubmit it: {e}")
        }
        other => anyhow::Error::new(other).context(format!("{function} failed")),
    }
}
