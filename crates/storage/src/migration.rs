use sea_orm::sea_query::{ColumnDef, Index, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::entity::transactions;
use transfer_watch_domain::storage::{StorageError, StorageResult};

pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    let backend = db.get_database_backend();

    let transactions_table = Table::create()
        .table(transactions::Entity)
        .col(
            ColumnDef::new(transactions::Column::TxHash)
                .string_len(128)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(transactions::Column::FromAddress)
                .string_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new(transactions::Column::ToAddress)
                .string_len(64)
                .not_null(),
        )
        .col(ColumnDef::new(transactions::Column::Amount).double().not_null())
        .col(
            ColumnDef::new(transactions::Column::WatchedAddress)
                .string_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new(transactions::Column::BlockTime)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(transactions::Column::Asset)
                .string_len(8)
                .not_null(),
        )
        .to_owned();
    create_table(db, backend, transactions_table).await?;

    let block_time_index = Index::create()
        .if_not_exists()
        .name("idx_transactions_block_time")
        .table(transactions::Entity)
        .col(transactions::Column::BlockTime)
        .to_owned();
    db.execute(backend.build(&block_time_index))
        .await
        .map_err(StorageError::from_source)?;

    Ok(())
}

async fn create_table(
    db: &DatabaseConnection,
    backend: DatabaseBackend,
    mut statement: TableCreateStatement,
) -> StorageResult<()> {
    statement.if_not_exists();
    db.execute(backend.build(&statement))
        .await
        .map_err(StorageError::from_source)?;
    Ok(())
}
