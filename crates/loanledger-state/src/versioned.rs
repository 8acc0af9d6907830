//! Versioned key-value store abstraction
//!
//! Every committed key carries the sequence number of the transaction that
//! last wrote it. A transaction's [`RwSet`] remembers the version it saw for
//! each key it read (or that the key was absent); the store commits the
//! writes only if all of those versions are still current.

use std::collections::BTreeMap;

use crate::simulator::TxId;
use crate::StateError;

/// Sequence number of the committing transaction
pub type Version = u64;

/// A committed value and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Read-set and write-set produced by simulating one transaction
///
/// Keys are kept sorted so that applying a write-set is order-independent
/// of how the contract issued its writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RwSet {
    tx_id: TxId,
    reads: BTreeMap<String, Option<Version>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl RwSet {
    pub fn new(tx_id: TxId) -> Self {
        Self {
            tx_id,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// Records the version observed for `key`
    ///
    /// Only the first observation counts; later reads of the same key within
    /// the transaction are served from the same snapshot.
    pub fn record_read(&mut self, key: &str, version: Option<Version>) {
        self.reads.entry(key.to_string()).or_insert(version);
    }

    /// Buffers a write, replacing any earlier write to the same key
    pub fn record_write(&mut self, key: &str, value: Vec<u8>) {
        self.writes.insert(key.to_string(), value);
    }

    pub fn reads(&self) -> &BTreeMap<String, Option<Version>> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.writes
    }

    /// Returns true if committing would change nothing
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Checks every recorded read against the currently committed version
    ///
    /// `current` looks up the committed version of a key.
    pub fn validate<F>(&self, mut current: F) -> Result<(), StateError>
    where
        F: FnMut(&str) -> Option<Version>,
    {
        for (key, expected) in &self.reads {
            let actual = current(key);
            if actual != *expected {
                return Err(StateError::MvccReadConflict {
                    key: key.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Committed world state with per-key versions
#[async_trait::async_trait]
pub trait IVersionedStore: Send + Sync {
    /// Reads the committed value of `key`
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError>;

    /// Validates `rw_set` and applies its writes atomically
    ///
    /// Returns the version assigned to the written keys. On
    /// `StateError::MvccReadConflict` nothing is written.
    async fn commit(&self, rw_set: &RwSet) -> Result<Version, StateError>;

    /// Lists committed keys in ascending order
    async fn keys(&self) -> Result<Vec<String>, StateError>;
}
