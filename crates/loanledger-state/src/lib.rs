//! Loanledger State - Versioned world state and transaction simulation
//!
//! Stands in for the hosting ledger platform:
//! - Committed key-value state with a version per key
//! - Transaction simulation that records read-sets and buffers writes
//! - Optimistic (MVCC) commit that rejects stale read-sets
//!
//! ## Architecture
//!
//! The contract in `loanledger-core` only sees the `IWorldState` port.
//! [`TxSimulator`] implements that port for a single invocation on top of an
//! [`IVersionedStore`], which is either [`MemoryVersionedStore`] or
//! [`SqliteVersionedStore`]. [`Ledger`] ties the pieces together: simulate,
//! then commit.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use loanledger_state::{DatabasePool, Ledger, SqliteVersionedStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::in_memory().await?;
//! let ledger = Ledger::new(Arc::new(SqliteVersionedStore::new(pool.pool().clone())));
//! let args: Vec<String> = ["L1", "B1", "5000", "12"].iter().map(|s| s.to_string()).collect();
//! ledger.execute("RequestLoan", &args).await?;
//! # Ok(())
//! # }
//! ```

use loanledger_core::error::ContractError;

pub mod ledger;
pub mod memory;
pub mod pool;
pub mod simulator;
pub mod sqlite;
pub mod versioned;

pub use ledger::{Ledger, Simulated};
pub use memory::MemoryVersionedStore;
pub use pool::DatabasePool;
pub use simulator::{TxId, TxSimulator};
pub use sqlite::SqliteVersionedStore;
pub use versioned::{IVersionedStore, RwSet, Version, VersionedValue};

/// Errors that can occur while simulating or committing transactions
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A key read during simulation changed before the commit
    #[error("MVCC read conflict on key {key}: read version {expected:?}, committed version {actual:?}")]
    MvccReadConflict {
        key: String,
        expected: Option<Version>,
        actual: Option<Version>,
    },

    /// The contract rejected the invocation during simulation
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<sqlx::Error> for StateError {
    fn from(e: sqlx::Error) -> Self {
        StateError::QueryFailed(e.to_string())
    }
}

impl StateError {
    /// Returns true if resubmitting the same invocation may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StateError::MvccReadConflict { .. })
    }
}
