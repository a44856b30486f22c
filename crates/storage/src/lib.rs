//! SeaORM-backed storage adapter that satisfies the domain
//! `TransactionStore` trait while keeping the database backend swappable
//! (SQLite by default, PostgreSQL via feature flag).

mod entity;
mod migration;
mod transaction_store;

use std::sync::Arc;

use migration::run_migrations;
use sea_orm::{Database, DatabaseConnection};
use transfer_watch_domain::storage::{StorageError, StorageResult};

/// Shared storage handle used by the HTTP API and the monitor sessions.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStorage {
    /// Connects to the provided database URL and ensures the schema is present.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}
