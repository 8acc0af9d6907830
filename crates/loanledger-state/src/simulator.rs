//! Transaction simulation
//!
//! A [`TxSimulator`] is the world state seen by one contract invocation.
//! Reads are served from committed state and their versions recorded;
//! writes are buffered and never visible to other transactions until the
//! resulting [`RwSet`] is committed. Reads do not observe the invocation's
//! own buffered writes.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use loanledger_core::ports::IWorldState;

use crate::versioned::{IVersionedStore, RwSet};

/// Transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(Uuid);

impl TxId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World state for a single simulated transaction
pub struct TxSimulator {
    store: Arc<dyn IVersionedStore>,
    rw_set: Mutex<RwSet>,
}

impl TxSimulator {
    pub fn new(store: Arc<dyn IVersionedStore>) -> Self {
        Self {
            store,
            rw_set: Mutex::new(RwSet::new(TxId::new())),
        }
    }

    /// Returns a snapshot of the read-set and write-set so far
    pub async fn rw_set(&self) -> RwSet {
        self.rw_set.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl IWorldState for TxSimulator {
    async fn get_state(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let committed = self.store.get(key).await?;
        let mut rw_set = self.rw_set.lock().await;
        rw_set.record_read(key, committed.as_ref().map(|v| v.version));

        tracing::trace!(
            tx_id = %rw_set.tx_id(),
            key,
            version = ?committed.as_ref().map(|v| v.version),
            "Simulated read"
        );
        Ok(committed.map(|v| v.value))
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        let mut rw_set = self.rw_set.lock().await;
        tracing::trace!(tx_id = %rw_set.tx_id(), key, size = value.len(), "Buffered write");
        rw_set.record_write(key, value);
        Ok(())
    }
}
