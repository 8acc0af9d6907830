//! Loan inspection commands
//!
//! `show`, `history` and `list` are thin wrappers over the read-only
//! contract functions. They never commit anything.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use loanledger_core::domain::Loan;

use super::{invocation_error, CliContext};
use crate::output::{get_formatter, OutputFormatter};

/// Decodes a read payload returned by the contract
pub fn decode_loan(payload: &[u8]) -> Result<Loan> {
    serde_json::from_slice(payload).context("Contract returned an unreadable loan record")
}

/// Prints the fields of `loan` in human-readable form
pub fn print_loan(formatter: &dyn OutputFormatter, loan: &Loan) {
    formatter.success(&format!("Loan {}", loan.loan_id()));
    formatter.field("Status", loan.status().name());
    formatter.field("Borrower", loan.borrower_id().as_str());
    formatter.field(
        "Lender",
        loan.lender_id().map(|l| l.as_str()).unwrap_or("-"),
    );
    formatter.field("Amount", &format!("{:.2}", loan.amount()));
    formatter.field("Interest rate", &loan.interest_rate().to_string());
    formatter.field("Duration", &loan.duration().to_string());
    formatter.field("Remaining balance", &format!("{:.2}", loan.remaining_balance()));
    if !loan.disbursement_date().is_empty() {
        formatter.field("Disbursed", loan.disbursement_date());
    }
    if !loan.collateral().is_empty() {
        formatter.field("Collateral", loan.collateral());
    }
    formatter.field("Audit entries", &loan.audit_history().len().to_string());
}

fn loan_json(payload: &[u8]) -> Result<serde_json::Value> {
    serde_json::from_slice(payload).context("Contract returned invalid JSON")
}

/// Show the current record of a loan
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Loan identifier
    pub loan_id: String,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let ledger = ctx.open_ledger().await?;

        info!(loan_id = %self.loan_id, "Showing loan");
        let payload = ledger
            .execute("CheckLoanStatus", &[self.loan_id.clone()])
            .await
            .map_err(|e| invocation_error("CheckLoanStatus", e))?;

        if ctx.format.is_json() {
            formatter.print_json(&loan_json(&payload)?);
        } else {
            print_loan(formatter.as_ref(), &decode_loan(&payload)?);
        }
        Ok(())
    }
}

/// Show the audit history of a loan
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Loan identifier
    pub loan_id: String,
}

impl HistoryCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let ledger = ctx.open_ledger().await?;

        let payload = ledger
            .execute("GetLoanHistory", &[self.loan_id.clone()])
            .await
            .map_err(|e| invocation_error("GetLoanHistory", e))?;
        let loan = decode_loan(&payload)?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "loanId": loan.loan_id().as_str(),
                "status": loan.status().name(),
                "auditHistory": loan.audit_history().entries(),
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "History of loan {} ({})",
            loan.loan_id(),
            loan.status()
        ));
        if loan.audit_history().is_empty() {
            formatter.info("No transitions recorded yet.");
        }
        for (i, entry) in loan.audit_history().entries().iter().enumerate() {
            formatter.info(&format!("{:>3}. {}", i + 1, entry));
        }
        Ok(())
    }
}

/// List loans in the world state
#[derive(Debug, Args)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let ledger = ctx.open_ledger().await?;

        let keys = ledger
            .store()
            .keys()
            .await
            .context("Failed to list world state keys")?;

        let mut loans = Vec::with_capacity(keys.len());
        for key in &keys {
            match ledger.execute("QueryLoan", &[key.clone()]).await {
                Ok(payload) => loans.push(decode_loan(&payload)?),
                Err(e) => formatter.warn(&format!("Skipping {key}: {e}")),
            }
        }

        if ctx.format.is_json() {
            let rows: Vec<serde_json::Value> = loans
                .iter()
                .map(|loan| {
                    serde_json::json!({
                        "loanId": loan.loan_id().as_str(),
                        "status": loan.status().name(),
                        "remainingBalance": loan.remaining_balance(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::Value::Array(rows));
            return Ok(());
        }

        if loans.is_empty() {
            formatter.info("No loans recorded.");
            return Ok(());
        }
        formatter.success(&format!("{} loan(s)", loans.len()));
        formatter.info(&format!("{:<16} {:<10} {:>14}", "LOAN", "STATUS", "BALANCE"));
        for loan in &loans {
            formatter.info(&format!(
                "{:<16} {:<10} {:>14.2}",
                loan.loan_id().as_str(),
                loan.status().name(),
                loan.remaining_balance()
            ));
        }
        Ok(())
    }
}
