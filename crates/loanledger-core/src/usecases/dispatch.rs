//! Name-based invocation surface
//!
//! The hosting ledger delivers a function name and positional string
//! arguments. [`LoanContract::invoke`] decodes both, runs the matching
//! lifecycle operation and returns its payload: empty for writes, the
//! encoded loan for reads.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::args::{
    expect_args, expect_args_between, parse_duration, parse_loan_id, parse_number,
    parse_party_id,
};
use super::loan_contract::LoanContract;
use crate::error::ContractError;
use crate::store;

/// Entry points exposed to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    RequestLoan,
    ApproveLoan,
    DisburseLoan,
    RepayLoan,
    CheckLoanStatus,
    MarkAsDefaulted,
    AddCollateral,
    GetLoanHistory,
    QueryLoan,
}

impl Operation {
    /// All entry points, in declaration order
    pub const ALL: [Operation; 10] = [
        Operation::Init,
        Operation::RequestLoan,
        Operation::ApproveLoan,
        Operation::DisburseLoan,
        Operation::RepayLoan,
        Operation::CheckLoanStatus,
        Operation::MarkAsDefaulted,
        Operation::AddCollateral,
        Operation::GetLoanHistory,
        Operation::QueryLoan,
    ];

    /// Returns the function name the ledger uses for this entry point
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init => "Init",
            Operation::RequestLoan => "RequestLoan",
            Operation::ApproveLoan => "ApproveLoan",
            Operation::DisburseLoan => "DisburseLoan",
            Operation::RepayLoan => "RepayLoan",
            Operation::CheckLoanStatus => "CheckLoanStatus",
            Operation::MarkAsDefaulted => "MarkAsDefaulted",
            Operation::AddCollateral => "AddCollateral",
            Operation::GetLoanHistory => "GetLoanHistory",
            Operation::QueryLoan => "QueryLoan",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ContractError::InvalidOperation(s.to_string()))
    }
}

impl LoanContract {
    /// Runs the entry point named `function` with positional `args`
    ///
    /// Arguments are fully decoded before the world state is touched, so a
    /// malformed call performs no reads.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for an unknown name, `InvalidArgument` for a wrong
    /// argument count or undecodable value, otherwise whatever the operation
    /// itself reports.
    pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Vec<u8>, ContractError> {
        let operation: Operation = function.parse()?;
        debug!(%operation, argc = args.len(), "Invoking contract");

        match operation {
            Operation::Init => Ok(Vec::new()),
            Operation::RequestLoan => {
                expect_args_between(args, 4, 5)?;
                let loan_id = parse_loan_id(&args[0])?;
                let borrower_id = parse_party_id(&args[1])?;
                let amount = parse_number(&args[2], "loan amount")?;
                let duration = parse_duration(&args[3])?;
                let interest_rate = match args.get(4) {
                    Some(raw) => parse_number(raw, "interest rate")?,
                    None => 0.0,
                };
                self.request_loan(loan_id, borrower_id, amount, duration, interest_rate)
                    .await?;
                Ok(Vec::new())
            }
            Operation::ApproveLoan => {
                expect_args(args, 2)?;
                let loan_id = parse_loan_id(&args[0])?;
                let lender_id = parse_party_id(&args[1])?;
                self.approve_loan(&loan_id, lender_id).await?;
                Ok(Vec::new())
            }
            Operation::DisburseLoan => {
                expect_args(args, 2)?;
                let loan_id = parse_loan_id(&args[0])?;
                self.disburse_loan(&loan_id, args[1].clone()).await?;
                Ok(Vec::new())
            }
            Operation::RepayLoan => {
                expect_args(args, 2)?;
                let loan_id = parse_loan_id(&args[0])?;
                let amount = parse_number(&args[1], "repayment amount")?;
                self.repay_loan(&loan_id, amount).await?;
                Ok(Vec::new())
            }
            Operation::MarkAsDefaulted => {
                expect_args(args, 1)?;
                let loan_id = parse_loan_id(&args[0])?;
                self.mark_as_defaulted(&loan_id).await?;
                Ok(Vec::new())
            }
            Operation::AddCollateral => {
                expect_args(args, 2)?;
                let loan_id = parse_loan_id(&args[0])?;
                self.add_collateral(&loan_id, args[1].clone()).await?;
                Ok(Vec::new())
            }
            Operation::CheckLoanStatus => {
                expect_args(args, 1)?;
                self.check_loan_status(&parse_loan_id(&args[0])?).await
            }
            Operation::GetLoanHistory => {
                expect_args(args, 1)?;
                self.get_loan_history(&parse_loan_id(&args[0])?).await
            }
            Operation::QueryLoan => {
                expect_args(args, 1)?;
                let loan = self.query_loan(&parse_loan_id(&args[0])?).await?;
                store::encode(&loan)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{Loan, LoanStatus};
    use crate::error::ErrorKind;
    use crate::ports::IWorldState;

    /// In-memory world state counting reads
    #[derive(Default)]
    struct CountingState {
        data: Mutex<HashMap<String, Vec<u8>>>,
        reads: Mutex<usize>,
    }

    #[async_trait]
    impl IWorldState for CountingState {
        async fn get_state(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
            self.data.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (Arc<CountingState>, LoanContract) {
        let state = Arc::new(CountingState::default());
        (state.clone(), LoanContract::new(state))
    }

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        let err = "requestLoan".parse::<Operation>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_full_lifecycle_by_name() {
        let (_state, contract) = setup();

        let calls: [(&str, &[&str]); 4] = [
            ("RequestLoan", &["L1", "B1", "5000", "12"]),
            ("ApproveLoan", &["L1", "LEN1"]),
            ("DisburseLoan", &["L1", "2024-01-01"]),
            ("RepayLoan", &["L1", "5000"]),
        ];
        for (function, raw) in calls {
            let payload = contract.invoke(function, &args(raw)).await.unwrap();
            assert!(payload.is_empty(), "{function} returned a payload");
        }

        let bytes = contract
            .invoke("GetLoanHistory", &args(&["L1"]))
            .await
            .unwrap();
        let loan: Loan = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(loan.status(), LoanStatus::Repaid);
        assert_eq!(loan.remaining_balance(), 0.0);
        assert_eq!(loan.interest_rate(), 0.0);
        assert_eq!(
            loan.audit_history().entries(),
            &[
                "Loan Approved",
                "Loan Disbursed",
                "Repayment of 5000.000000 made"
            ]
        );
    }

    #[tokio::test]
    async fn test_request_with_interest_rate() {
        let (_state, contract) = setup();
        contract
            .invoke("RequestLoan", &args(&["L1", "B1", "1000", "6", "0.07"]))
            .await
            .unwrap();

        let bytes = contract.invoke("QueryLoan", &args(&["L1"])).await.unwrap();
        let loan: Loan = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(loan.interest_rate(), 0.07);
        assert_eq!(loan.duration(), 6);
    }

    #[tokio::test]
    async fn test_bad_arguments_do_not_read_state() {
        let (state, contract) = setup();

        let bad: [(&str, &[&str]); 6] = [
            ("RequestLoan", &["L1", "B1", "abc", "12"]),
            ("RequestLoan", &["L1", "B1", "5000", "12.5"]),
            ("RequestLoan", &["L1", "B1", "5000"]),
            ("ApproveLoan", &["L1"]),
            ("RepayLoan", &["L1", "lots"]),
            ("CheckLoanStatus", &[]),
        ];
        for (function, raw) in bad {
            let err = contract.invoke(function, &args(raw)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{function} {raw:?}");
        }
        assert_eq!(*state.reads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let (state, contract) = setup();
        let err = contract
            .invoke("DeleteLoan", &args(&["L1"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.to_string(), "invalid function name: DeleteLoan");
        assert_eq!(*state.reads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_init_is_a_no_op() {
        let (state, contract) = setup();
        assert!(contract.invoke("Init", &[]).await.unwrap().is_empty());
        assert!(state.data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_of_missing_loan() {
        let (_state, contract) = setup();
        let err = contract
            .invoke("CheckLoanStatus", &args(&["L404"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
