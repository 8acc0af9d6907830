//! In-memory versioned store
//!
//! Used by tests and by `loanledger replay --in-memory`. Commits are
//! serialized by a single lock, so validation and application of a
//! read-write set happen atomically.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::versioned::{IVersionedStore, RwSet, Version, VersionedValue};
use crate::StateError;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, VersionedValue>,
    height: Version,
}

/// Versioned store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryVersionedStore {
    inner: Mutex<Inner>,
}

impl MemoryVersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions committed so far
    pub async fn height(&self) -> Version {
        self.inner.lock().await.height
    }
}

#[async_trait::async_trait]
impl IVersionedStore for MemoryVersionedStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError> {
        Ok(self.inner.lock().await.entries.get(key).cloned())
    }

    async fn commit(&self, rw_set: &RwSet) -> Result<Version, StateError> {
        let mut inner = self.inner.lock().await;

        if let Err(e) = rw_set.validate(|key| inner.entries.get(key).map(|v| v.version)) {
            tracing::warn!(tx_id = %rw_set.tx_id(), error = %e, "Transaction rejected");
            return Err(e);
        }

        let version = inner.height + 1;
        for (key, value) in rw_set.writes() {
            inner.entries.insert(
                key.clone(),
                VersionedValue {
                    value: value.clone(),
                    version,
                },
            );
        }
        inner.height = version;

        tracing::debug!(
            tx_id = %rw_set.tx_id(),
            version,
            writes = rw_set.writes().len(),
            "Transaction committed"
        );
        Ok(version)
    }

    async fn keys(&self) -> Result<Vec<String>, StateError> {
        let mut keys: Vec<String> = self.inner.lock().await.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
