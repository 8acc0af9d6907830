//! Simulate-then-commit driver
//!
//! [`Ledger`] plays the hosting platform's role for one peer: it runs each
//! invocation against a fresh [`TxSimulator`] and submits the resulting
//! read-write set to the versioned store. A rejected commit is reported to
//! the caller and never retried here.

use std::sync::Arc;

use loanledger_core::usecases::LoanContract;

use crate::simulator::TxSimulator;
use crate::versioned::{IVersionedStore, RwSet, Version};
use crate::StateError;

/// Result of simulating one invocation, not yet committed
#[derive(Debug, Clone)]
pub struct Simulated {
    payload: Vec<u8>,
    rw_set: RwSet,
}

impl Simulated {
    /// Response payload returned by the contract
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn rw_set(&self) -> &RwSet {
        &self.rw_set
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Local ledger peer backed by a versioned store
pub struct Ledger {
    store: Arc<dyn IVersionedStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn IVersionedStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IVersionedStore> {
        &self.store
    }

    /// Runs `function` against current committed state without committing
    ///
    /// # Errors
    ///
    /// `StateError::Contract` if the contract rejects the invocation.
    pub async fn simulate(&self, function: &str, args: &[String]) -> Result<Simulated, StateError> {
        let simulator = Arc::new(TxSimulator::new(self.store.clone()));
        let contract = LoanContract::new(simulator.clone());

        let payload = contract.invoke(function, args).await?;
        let rw_set = simulator.rw_set().await;

        tracing::debug!(
            tx_id = %rw_set.tx_id(),
            function,
            reads = rw_set.reads().len(),
            writes = rw_set.writes().len(),
            "Invocation simulated"
        );
        Ok(Simulated { payload, rw_set })
    }

    /// Commits a simulated invocation
    ///
    /// Read-only simulations are not committed and return `None`.
    ///
    /// # Errors
    ///
    /// `StateError::MvccReadConflict` if a key it read has since changed.
    pub async fn submit(&self, simulated: &Simulated) -> Result<Option<Version>, StateError> {
        if simulated.rw_set.is_read_only() {
            return Ok(None);
        }
        let version = self.store.commit(&simulated.rw_set).await?;
        tracing::info!(
            tx_id = %simulated.rw_set.tx_id(),
            version,
            "Transaction committed"
        );
        Ok(Some(version))
    }

    /// Simulates and commits in one step, returning the contract's payload
    pub async fn execute(&self, function: &str, args: &[String]) -> Result<Vec<u8>, StateError> {
        let simulated = self.simulate(function, args).await?;
        self.submit(&simulated).await?;
        Ok(simulated.into_payload())
    }
}
