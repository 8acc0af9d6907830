//! Replay command - Run a script of invocations
//!
//! A script holds one JSON object per line:
//!
//! ```text
//! {"function": "RequestLoan", "args": ["L1", "B1", "5000", "12"]}
//! {"function": "ApproveLoan", "args": ["L1", "LEN1"]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Each step is
//! simulated and committed before the next one starts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use tracing::{info, warn};

use loanledger_state::{Ledger, MemoryVersionedStore};

use super::{invocation_error, CliContext};
use crate::output::{get_formatter, OutputFormatter};

/// One scripted invocation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Parses a replay script
pub fn parse_script(content: &str) -> Result<Vec<Step>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid step on line {}", n + 1))
        })
        .collect()
}

/// Run a file of invocations in order
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// Script file with one JSON invocation per line
    pub file: PathBuf,

    /// Run against a throwaway in-memory world state
    #[arg(long)]
    pub in_memory: bool,

    /// Continue with the next step after a failed one
    #[arg(long)]
    pub keep_going: bool,
}

/// Outcome counts of a replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl ReplayCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read script {}", self.file.display()))?;
        let steps = parse_script(&content)?;

        let ledger = if self.in_memory {
            Ledger::new(Arc::new(MemoryVersionedStore::new()))
        } else {
            ctx.open_ledger().await?
        };

        info!(
            file = %self.file.display(),
            steps = steps.len(),
            in_memory = self.in_memory,
            "Replaying script"
        );
        let summary = replay(&ledger, &steps, self.keep_going, formatter.as_ref()).await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "succeeded": summary.succeeded,
                "failed": summary.failed,
            }));
        } else {
            formatter.info(&format!(
                "{} succeeded, {} failed",
                summary.succeeded, summary.failed
            ));
        }

        if summary.failed > 0 {
            anyhow::bail!("{} step(s) failed", summary.failed);
        }
        Ok(())
    }
}

/// Executes `steps` in order, stopping at the first failure unless `keep_going`
pub async fn replay(
    ledger: &Ledger,
    steps: &[Step],
    keep_going: bool,
    formatter: &dyn OutputFormatter,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (i, step) in steps.iter().enumerate() {
        let label = format!("[{}] {} {}", i + 1, step.function, step.args.join(" "));
        match ledger.execute(&step.function, &step.args).await {
            Ok(_) => {
                summary.succeeded += 1;
                formatter.success(label.trim_end());
            }
            Err(e) => {
                let err = invocation_error(&step.function, e);
                summary.failed += 1;
                warn!(step = i + 1, error = %err, "Replay step failed");
                formatter.warn(&format!("{}: {err}", label.trim_end()));
                if !keep_going {
                    break;
                }
            }
        }
    }

    Ok(summary)
}
