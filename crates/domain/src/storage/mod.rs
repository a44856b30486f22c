use async_trait::async_trait;
use thiserror::Error;

use crate::model::TransactionRecord;

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Append-only persistence for observed transfers, keyed by transaction hash.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn exists(&self, tx_hash: &str) -> StorageResult<bool>;
    /// Returns `false` when a record with the same hash was already present.
    async fn insert(&self, record: TransactionRecord) -> StorageResult<bool>;
    /// Most recent records first, ordered by block time.
    async fn recent(&self, limit: u64) -> StorageResult<Vec<TransactionRecord>>;
}
