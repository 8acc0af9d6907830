//! World state port (driven/secondary port)
//!
//! This module defines the interface through which the contract reads and
//! writes the ledger's key-value store during one transaction.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific and
//!   don't need domain-level classification; the record store maps every
//!   failure to `StoreUnavailable`.
//! - Concurrency control is the platform's job. An implementation hands the
//!   contract a consistent snapshot for the duration of one invocation and
//!   validates the read-set at commit time; the contract itself never locks.
//! - Writes made during an invocation are visible to later reads of the same
//!   invocation only if the implementation chooses so; the contract never
//!   relies on read-your-writes.

/// Port trait for the ledger's key-value world state
#[async_trait::async_trait]
pub trait IWorldState: Send + Sync {
    /// Reads the value stored under `key`
    ///
    /// Returns `None` if the key has never been written.
    async fn get_state(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Writes `value` under `key` (insert or overwrite)
    async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()>;
}
