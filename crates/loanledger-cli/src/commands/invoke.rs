//! Invoke command - Run one contract function
//!
//! Simulates the invocation against the committed world state, then commits
//! its writes. Read-only functions print the returned loan; write functions
//! report the transaction that was committed.

use anyhow::Result;
use clap::Args;
use tracing::info;

use loanledger_state::{Ledger, Simulated};

use super::loan::{decode_loan, print_loan};
use super::{invocation_error, CliContext};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Invoke a contract function
#[derive(Debug, Args)]
pub struct InvokeCommand {
    /// Function name, e.g. RequestLoan or RepayLoan
    pub function: String,

    /// Positional arguments passed to the function as strings
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl InvokeCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let ledger = ctx.open_ledger().await?;

        info!(function = %self.function, argc = self.args.len(), "Invoking contract");
        run(&ledger, &self.function, &self.args, ctx.format, formatter.as_ref()).await
    }
}

/// Simulates and commits one invocation, then reports the outcome
pub async fn run(
    ledger: &Ledger,
    function: &str,
    args: &[String],
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let simulated = ledger
        .simulate(function, args)
        .await
        .map_err(|e| invocation_error(function, e))?;
    let version = ledger
        .submit(&simulated)
        .await
        .map_err(|e| invocation_error(function, e))?;

    report(function, &simulated, version, format, formatter)
}

fn report(
    function: &str,
    simulated: &Simulated,
    version: Option<u64>,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let tx_id = simulated.rw_set().tx_id().to_string();

    if !simulated.payload().is_empty() {
        if format.is_json() {
            let value: serde_json::Value = serde_json::from_slice(simulated.payload())?;
            formatter.print_json(&value);
        } else {
            print_loan(formatter, &decode_loan(simulated.payload())?);
        }
        return Ok(());
    }

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "function": function,
            "txId": tx_id,
            "version": version,
        }));
    } else {
        match version {
            Some(v) => formatter.success(&format!("{function} committed at version {v}")),
            None => formatter.success(&format!("{function} completed, nothing to commit")),
        }
        formatter.field("Transaction", &tx_id);
    }
    Ok(())
}
