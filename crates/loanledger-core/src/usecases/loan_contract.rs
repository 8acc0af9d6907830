//! Loan lifecycle use case
//!
//! Orchestrates one lifecycle operation per call as an explicit pipeline:
//! load the loan, validate and apply the transition on the in-memory copy,
//! then save it. Validation completes before any field changes, and the
//! record is written only once every step has succeeded, so a failed call
//! leaves the world state untouched.
//!
//! The contract holds no state of its own and takes no locks. Conflicting
//! invocations on the same loan are resolved by the platform's read-set
//! validation when the transaction commits.

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, Loan, LoanId, PartyId};
use crate::error::ContractError;
use crate::ports::IWorldState;
use crate::store::{self, LoanStore};

/// Use case for the loan lifecycle
pub struct LoanContract {
    store: LoanStore,
}

impl LoanContract {
    /// Creates a contract bound to the world state of one transaction
    pub fn new(world_state: Arc<dyn IWorldState>) -> Self {
        Self {
            store: LoanStore::new(world_state),
        }
    }

    /// Runs `apply` against the stored loan and persists the result
    async fn transition<F>(
        &self,
        loan_id: &LoanId,
        operation: &'static str,
        apply: F,
    ) -> Result<Loan, ContractError>
    where
        F: FnOnce(&mut Loan) -> Result<(), DomainError>,
    {
        let mut loan = self.store.load_existing(loan_id).await?;
        let from = loan.status();

        apply(&mut loan)?;
        self.store.save(&loan).await?;

        info!(
            loan_id = %loan_id,
            operation,
            from = %from,
            to = %loan.status(),
            "Loan transition applied"
        );
        Ok(loan)
    }

    /// Creates a new loan request in `Pending` state
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if any record is stored under `loan_id`
    /// - `InvalidArgument` if the amount, rate or term is out of range
    pub async fn request_loan(
        &self,
        loan_id: LoanId,
        borrower_id: PartyId,
        amount: f64,
        duration: u32,
        interest_rate: f64,
    ) -> Result<Loan, ContractError> {
        let loan = Loan::request(loan_id, borrower_id, amount, duration, interest_rate)?;

        if self.store.exists(loan.loan_id()).await? {
            return Err(ContractError::AlreadyExists(loan.loan_id().to_string()));
        }

        self.store.save(&loan).await?;
        info!(
            loan_id = %loan.loan_id(),
            borrower_id = %loan.borrower_id(),
            amount,
            duration,
            "Loan requested"
        );
        Ok(loan)
    }

    /// Approves a pending loan and records the lender
    pub async fn approve_loan(
        &self,
        loan_id: &LoanId,
        lender_id: PartyId,
    ) -> Result<Loan, ContractError> {
        self.transition(loan_id, "ApproveLoan", |loan| loan.approve(lender_id))
            .await
    }

    /// Disburses an approved loan, making it active
    pub async fn disburse_loan(
        &self,
        loan_id: &LoanId,
        disbursement_date: String,
    ) -> Result<Loan, ContractError> {
        self.transition(loan_id, "DisburseLoan", |loan| {
            loan.disburse(disbursement_date)
        })
        .await
    }

    /// Applies a repayment to an active loan
    ///
    /// The amount is not range-checked; see [`Loan::repay`].
    pub async fn repay_loan(&self, loan_id: &LoanId, amount: f64) -> Result<Loan, ContractError> {
        self.transition(loan_id, "RepayLoan", |loan| loan.repay(amount).map(|_| ()))
            .await
    }

    /// Marks an active loan as defaulted
    pub async fn mark_as_defaulted(&self, loan_id: &LoanId) -> Result<Loan, ContractError> {
        self.transition(loan_id, "MarkAsDefaulted", Loan::mark_defaulted)
            .await
    }

    /// Attaches collateral to a loan that has not been disbursed yet
    pub async fn add_collateral(
        &self,
        loan_id: &LoanId,
        collateral: String,
    ) -> Result<Loan, ContractError> {
        self.transition(loan_id, "AddCollateral", |loan| {
            loan.add_collateral(collateral)
        })
        .await
    }

    /// Returns the current loan record
    pub async fn query_loan(&self, loan_id: &LoanId) -> Result<Loan, ContractError> {
        self.store.load_existing(loan_id).await
    }

    /// Returns the encoded loan record, including its status
    pub async fn check_loan_status(&self, loan_id: &LoanId) -> Result<Vec<u8>, ContractError> {
        let loan = self.query_loan(loan_id).await?;
        store::encode(&loan)
    }

    /// Returns the encoded loan record, including its audit history
    pub async fn get_loan_history(&self, loan_id: &LoanId) -> Result<Vec<u8>, ContractError> {
        let loan = self.query_loan(loan_id).await?;
        store::encode(&loan)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::LoanStatus;
    use crate::error::ErrorKind;

    /// In-memory world state that records every call it receives
    #[derive(Default)]
    struct RecordingState {
        data: Mutex<HashMap<String, Vec<u8>>>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingState {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }

        fn raw(&self, key: &str) -> Option<Vec<u8>> {
            self.data.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl IWorldState for RecordingState {
        async fn get_state(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            self.calls.lock().unwrap().push(format!("get:{key}"));
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("put:{key}"));
            self.data.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    fn id(s: &str) -> LoanId {
        LoanId::new(s).unwrap()
    }

    fn party(s: &str) -> PartyId {
        PartyId::new(s).unwrap()
    }

    async fn setup() -> (Arc<RecordingState>, LoanContract) {
        let state = Arc::new(RecordingState::default());
        let contract = LoanContract::new(state.clone());
        (state, contract)
    }

    async fn active(contract: &LoanContract, loan_id: &str, amount: f64) {
        contract
            .request_loan(id(loan_id), party("B1"), amount, 12, 0.0)
            .await
            .unwrap();
        contract
            .approve_loan(&id(loan_id), party("LEN1"))
            .await
            .unwrap();
        contract
            .disburse_loan(&id(loan_id), "2024-01-01".into())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_rejects_duplicate() {
        let (state, contract) = setup().await;
        contract
            .request_loan(id("L1"), party("B1"), 100.0, 6, 0.0)
            .await
            .unwrap();
        let stored = state.raw("L1");

        let err = contract
            .request_loan(id("L1"), party("B2"), 999.0, 3, 0.0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(state.raw("L1"), stored);
    }

    #[tokio::test]
    async fn test_approve_twice_fails_second_time() {
        let (_state, contract) = setup().await;
        contract
            .request_loan(id("L1"), party("B1"), 100.0, 6, 0.0)
            .await
            .unwrap();

        contract.approve_loan(&id("L1"), party("LEN1")).await.unwrap();
        let err = contract
            .approve_loan(&id("L1"), party("LEN2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let loan = contract.query_loan(&id("L1")).await.unwrap();
        assert_eq!(loan.lender_id().map(PartyId::as_str), Some("LEN1"));
    }

    #[tokio::test]
    async fn test_repay_400_then_700_clamps() {
        let (_state, contract) = setup().await;
        active(&contract, "L1", 1000.0).await;

        let loan = contract.repay_loan(&id("L1"), 400.0).await.unwrap();
        assert_eq!(loan.remaining_balance(), 600.0);
        assert_eq!(loan.status(), LoanStatus::Active);

        let loan = contract.repay_loan(&id("L1"), 700.0).await.unwrap();
        assert_eq!(loan.remaining_balance(), 0.0);
        assert_eq!(loan.status(), LoanStatus::Repaid);
    }

    #[tokio::test]
    async fn test_collateral_rejected_after_disbursement() {
        let (state, contract) = setup().await;
        active(&contract, "L1", 1000.0).await;
        let stored = state.raw("L1");

        let err = contract
            .add_collateral(&id("L1"), "Gold".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(state.raw("L1"), stored);
    }

    #[tokio::test]
    async fn test_operations_on_missing_loan() {
        let (state, contract) = setup().await;
        let missing = id("ghost");

        let errors = vec![
            contract.approve_loan(&missing, party("LEN1")).await.unwrap_err(),
            contract
                .disburse_loan(&missing, "2024-01-01".into())
                .await
                .unwrap_err(),
            contract.repay_loan(&missing, 1.0).await.unwrap_err(),
            contract.mark_as_defaulted(&missing).await.unwrap_err(),
            contract
                .add_collateral(&missing, "x".into())
                .await
                .unwrap_err(),
            contract.check_loan_status(&missing).await.unwrap_err(),
            contract.get_loan_history(&missing).await.unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
        assert!(state.calls().iter().all(|c| c.starts_with("get:")));
    }

    #[tokio::test]
    async fn test_failed_transition_does_not_write() {
        let (state, contract) = setup().await;
        contract
            .request_loan(id("L1"), party("B1"), 100.0, 6, 0.0)
            .await
            .unwrap();
        state.clear_calls();

        assert!(contract.mark_as_defaulted(&id("L1")).await.is_err());
        assert!(contract.repay_loan(&id("L1"), 10.0).await.is_err());
        assert!(contract
            .disburse_loan(&id("L1"), "2024-01-01".into())
            .await
            .is_err());

        assert_eq!(state.calls(), vec!["get:L1", "get:L1", "get:L1"]);
    }

    #[tokio::test]
    async fn test_transition_is_single_read_then_single_write() {
        let (state, contract) = setup().await;
        contract
            .request_loan(id("L1"), party("B1"), 100.0, 6, 0.0)
            .await
            .unwrap();
        assert_eq!(state.calls(), vec!["get:L1", "put:L1"]);

        state.clear_calls();
        contract.approve_loan(&id("L1"), party("LEN1")).await.unwrap();
        assert_eq!(state.calls(), vec!["get:L1", "put:L1"]);
    }

    #[tokio::test]
    async fn test_reads_are_read_only() {
        let (state, contract) = setup().await;
        active(&contract, "L1", 100.0).await;
        state.clear_calls();

        let bytes = contract.check_loan_status(&id("L1")).await.unwrap();
        let history = contract.get_loan_history(&id("L1")).await.unwrap();
        assert_eq!(bytes, history);
        assert_eq!(state.calls(), vec!["get:L1", "get:L1"]);

        let loan: Loan = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            loan.audit_history().entries(),
            &["Loan Approved", "Loan Disbursed"]
        );
    }
}
