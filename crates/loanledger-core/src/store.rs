//! Loan record store
//!
//! Serializes loans to and from the world state, keyed by loan identifier.
//!
//! ## Record format
//!
//! A loan is stored as a JSON object with camelCase field names (see
//! [`Loan`]). The encoding is field-tagged, so future versions may add
//! fields: unknown fields are ignored on read, while a missing known field
//! makes the record corrupt rather than being filled with a default.
//! Encoding is deterministic (fixed field order, no whitespace), which keeps
//! write-sets byte-identical across replicas.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Loan, LoanId};
use crate::error::ContractError;
use crate::ports::IWorldState;

/// Encodes a loan into its stored form
///
/// # Errors
///
/// Returns `ContractError::CorruptRecord` if a monetary field is not finite;
/// JSON has no representation for it and the record could not be read back.
pub fn encode(loan: &Loan) -> Result<Vec<u8>, ContractError> {
    let numbers = [
        ("amount", loan.amount()),
        ("interestRate", loan.interest_rate()),
        ("repaymentDue", loan.repayment_due()),
        ("remainingBalance", loan.remaining_balance()),
    ];
    if let Some((field, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ContractError::CorruptRecord {
            loan_id: loan.loan_id().to_string(),
            reason: format!("failed to encode loan: {field} is {value}"),
        });
    }

    serde_json::to_vec(loan).map_err(|e| ContractError::CorruptRecord {
        loan_id: loan.loan_id().to_string(),
        reason: format!("failed to encode loan: {e}"),
    })
}

/// Decodes the bytes stored under `loan_id`
///
/// # Errors
///
/// Returns `ContractError::CorruptRecord` if the bytes are not a valid loan
/// or describe a loan stored under a different key.
pub fn decode(loan_id: &LoanId, bytes: &[u8]) -> Result<Loan, ContractError> {
    let loan: Loan = serde_json::from_slice(bytes).map_err(|e| ContractError::CorruptRecord {
        loan_id: loan_id.to_string(),
        reason: e.to_string(),
    })?;

    if loan.loan_id() != loan_id {
        return Err(ContractError::CorruptRecord {
            loan_id: loan_id.to_string(),
            reason: format!("record carries loan ID {}", loan.loan_id()),
        });
    }

    Ok(loan)
}

/// Loan persistence on top of the world-state port
pub struct LoanStore {
    world_state: Arc<dyn IWorldState>,
}

impl LoanStore {
    /// Creates a store reading and writing through `world_state`
    pub fn new(world_state: Arc<dyn IWorldState>) -> Self {
        Self { world_state }
    }

    async fn read(&self, loan_id: &LoanId) -> Result<Option<Vec<u8>>, ContractError> {
        self.world_state
            .get_state(loan_id.as_str())
            .await
            .map_err(|e| {
                ContractError::StoreUnavailable(format!("failed to read loan {loan_id}: {e:#}"))
            })
    }

    /// Loads the loan stored under `loan_id`, if any
    pub async fn load(&self, loan_id: &LoanId) -> Result<Option<Loan>, ContractError> {
        match self.read(loan_id).await? {
            Some(bytes) => {
                debug!(loan_id = %loan_id, size = bytes.len(), "Loaded loan record");
                decode(loan_id, &bytes).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Loads the loan stored under `loan_id`, failing with `NotFound` if absent
    pub async fn load_existing(&self, loan_id: &LoanId) -> Result<Loan, ContractError> {
        self.load(loan_id)
            .await?
            .ok_or_else(|| ContractError::NotFound(loan_id.to_string()))
    }

    /// Returns true if any record is stored under `loan_id`
    ///
    /// Does not decode the record: a corrupt record still occupies its key.
    pub async fn exists(&self, loan_id: &LoanId) -> Result<bool, ContractError> {
        Ok(self.read(loan_id).await?.is_some())
    }

    /// Writes `loan` under its own identifier
    pub async fn save(&self, loan: &Loan) -> Result<(), ContractError> {
        let bytes = encode(loan)?;
        let size = bytes.len();
        self.world_state
            .put_state(loan.loan_id().as_str(), bytes)
            .await
            .map_err(|e| {
                ContractError::StoreUnavailable(format!(
                    "failed to write loan {}: {e:#}",
                    loan.loan_id()
                ))
            })?;
        debug!(loan_id = %loan.loan_id(), size, "Saved loan record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{LoanStatus, PartyId};
    use crate::error::ErrorKind;

    /// Plain in-memory map
    #[derive(Default)]
    struct MapState {
        data: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl IWorldState for MapState {
        async fn get_state(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
            self.data.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    /// World state whose backing store is down
    struct BrokenState;

    #[async_trait]
    impl IWorldState for BrokenState {
        async fn get_state(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            anyhow::bail!("connection reset")
        }
        async fn put_state(&self, _key: &str, _value: Vec<u8>) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn sample_loan() -> Loan {
        Loan::request(
            LoanId::new("L1").unwrap(),
            PartyId::new("B1").unwrap(),
            5000.0,
            12,
            0.05,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let state = Arc::new(MapState::default());
        let store = LoanStore::new(state.clone());
        let loan = sample_loan();

        assert!(!store.exists(loan.loan_id()).await.unwrap());
        store.save(&loan).await.unwrap();
        assert!(store.exists(loan.loan_id()).await.unwrap());

        let loaded = store.load(loan.loan_id()).await.unwrap().unwrap();
        assert_eq!(loaded, loan);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = LoanStore::new(Arc::new(MapState::default()));
        let id = LoanId::new("nope").unwrap();

        assert!(store.load(&id).await.unwrap().is_none());
        let err = store.load_existing(&id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_record_is_corrupt() {
        let state = Arc::new(MapState::default());
        state
            .put_state("L1", b"{\"loanId\":\"L1\"".to_vec())
            .await
            .unwrap();
        let store = LoanStore::new(state);

        let err = store.load(&LoanId::new("L1").unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn test_missing_field_is_corrupt_not_defaulted() {
        let mut value = serde_json::to_value(sample_loan()).unwrap();
        value.as_object_mut().unwrap().remove("remainingBalance");

        let err = decode(
            &LoanId::new("L1").unwrap(),
            &serde_json::to_vec(&value).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn test_unknown_status_is_corrupt() {
        let mut value = serde_json::to_value(sample_loan()).unwrap();
        value["status"] = serde_json::json!("Cancelled");

        let err = decode(
            &LoanId::new("L1").unwrap(),
            &serde_json::to_vec(&value).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn test_key_mismatch_is_corrupt() {
        let bytes = encode(&sample_loan()).unwrap();
        let err = decode(&LoanId::new("L2").unwrap(), &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
    }

    #[test]
    fn test_decodes_legacy_record() {
        // Shape written before any transition: integral numbers, null history.
        let legacy = br#"{"loanId":"L1","borrowerId":"B1","lenderId":"","amount":5000,
            "interestRate":0,"duration":12,"status":"Pending","disbursementDate":"",
            "repaymentDue":0,"remainingBalance":5000,"collateral":"","defaulted":false,
            "auditHistory":null}"#;

        let loan = decode(&LoanId::new("L1").unwrap(), legacy).unwrap();
        assert_eq!(loan.status(), LoanStatus::Pending);
        assert_eq!(loan.amount(), 5000.0);
        assert!(loan.lender_id().is_none());
        assert!(loan.audit_history().is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut value = serde_json::to_value(sample_loan()).unwrap();
        value["riskScore"] = serde_json::json!(7);

        let loan = decode(
            &LoanId::new("L1").unwrap(),
            &serde_json::to_vec(&value).unwrap(),
        )
        .unwrap();
        assert_eq!(loan, sample_loan());
    }

    #[test]
    fn test_encoding_is_stable() {
        assert_eq!(encode(&sample_loan()).unwrap(), encode(&sample_loan()).unwrap());
    }

    #[tokio::test]
    async fn test_store_failures_are_unavailable() {
        let store = LoanStore::new(Arc::new(BrokenState));
        let id = LoanId::new("L1").unwrap();

        assert_eq!(
            store.load(&id).await.unwrap_err().kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            store.exists(&id).await.unwrap_err().kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            store.save(&sample_loan()).await.unwrap_err().kind(),
            ErrorKind::StoreUnavailable
        );
    }
}
