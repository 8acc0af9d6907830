//! SQLite implementation of IVersionedStore
//!
//! ## Schema
//!
//! | Table          | Purpose |
//! |----------------|---------|
//! | `transactions` | One row per committed transaction; `seq` is the version it assigns |
//! | `world_state`  | Current value of every key and the `seq` that last wrote it |
//!
//! A commit opens a database transaction whose first statement is the
//! `transactions` insert. That takes SQLite's write lock before any read-set
//! validation, so no other commit can slip in between validation and write.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};

use crate::versioned::{IVersionedStore, RwSet, Version, VersionedValue};
use crate::StateError;

/// SQLite-based versioned store
pub struct SqliteVersionedStore {
    pool: SqlitePool,
}

impl SqliteVersionedStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of transactions committed so far
    pub async fn height(&self) -> Result<Version, StateError> {
        let seq: Option<i64> = sqlx::query_scalar("SELECT MAX(seq) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(seq.unwrap_or(0) as Version)
    }
}

#[async_trait::async_trait]
impl IVersionedStore for SqliteVersionedStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError> {
        let row = sqlx::query("SELECT value, version FROM world_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let value: Vec<u8> = r.try_get("value")?;
                let version: i64 = r.try_get("version")?;
                Ok(Some(VersionedValue {
                    value,
                    version: version as Version,
                }))
            }
            None => Ok(None),
        }
    }

    async fn commit(&self, rw_set: &RwSet) -> Result<Version, StateError> {
        let tx_id = rw_set.tx_id().to_string();
        let mut tx = self.pool.begin().await?;

        let seq: i64 = sqlx::query_scalar(
            "INSERT INTO transactions (tx_id, write_count) VALUES (?, ?) RETURNING seq",
        )
        .bind(&tx_id)
        .bind(rw_set.writes().len() as i64)
        .fetch_one(&mut *tx)
        .await?;

        let mut committed = HashMap::with_capacity(rw_set.reads().len());
        for key in rw_set.reads().keys() {
            let version: Option<i64> =
                sqlx::query_scalar("SELECT version FROM world_state WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&mut *tx)
                    .await?;
            committed.insert(key.as_str(), version.map(|v| v as Version));
        }

        if let Err(e) = rw_set.validate(|key| committed.get(key).copied().flatten()) {
            tx.rollback().await?;
            tracing::warn!(tx_id = %tx_id, error = %e, "Transaction rejected");
            return Err(e);
        }

        for (key, value) in rw_set.writes() {
            sqlx::query("INSERT OR REPLACE INTO world_state (key, value, version) VALUES (?, ?, ?)")
                .bind(key)
                .bind(value.as_slice())
                .bind(seq)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            tx_id = %tx_id,
            version = seq,
            writes = rw_set.writes().len(),
            "Transaction committed"
        );
        Ok(seq as Version)
    }

    async fn keys(&self) -> Result<Vec<String>, StateError> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM world_state ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}
