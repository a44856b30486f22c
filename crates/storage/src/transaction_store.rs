use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use transfer_watch_domain::model::{AssetType, TransactionRecord};
use transfer_watch_domain::storage::{StorageError, StorageResult, TransactionStore};

use crate::entity::transactions::{self, AssetTypeDb};
use crate::SeaOrmStorage;

/// SQL `LIMIT` is bound as a signed 64-bit integer.
const MAX_LIMIT: u64 = i64::MAX as u64;

#[async_trait::async_trait]
impl TransactionStore for SeaOrmStorage {
    async fn exists(&self, tx_hash: &str) -> StorageResult<bool> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::TxHash.eq(tx_hash))
            .count(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(count > 0)
    }

    async fn insert(&self, record: TransactionRecord) -> StorageResult<bool> {
        let model = transactions::ActiveModel {
            tx_hash: Set(record.tx_hash),
            from_address: Set(record.from),
            to_address: Set(record.to),
            amount: Set(record.amount),
            watched_address: Set(record.address),
            block_time: Set(record.time),
            asset: Set(asset_to_db(record.asset)),
        };
        let inserted = transactions::Entity::insert(model)
            .on_conflict(
                OnConflict::column(transactions::Column::TxHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(inserted > 0)
    }

    async fn recent(&self, limit: u64) -> StorageResult<Vec<TransactionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let models = transactions::Entity::find()
            .order_by_desc(transactions::Column::BlockTime)
            .order_by_desc(transactions::Column::TxHash)
            .limit(limit.min(MAX_LIMIT))
            .all(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(models.into_iter().map(model_to_record).collect())
    }
}

fn asset_to_db(asset: AssetType) -> AssetTypeDb {
    match asset {
        AssetType::Usdc => AssetTypeDb::Usdc,
        AssetType::Sol => AssetTypeDb::Sol,
    }
}

fn model_to_record(model: transactions::Model) -> TransactionRecord {
    TransactionRecord {
        tx_hash: model.tx_hash,
        from: model.from_address,
        to: model.to_address,
        amount: model.amount,
        address: model.watched_address,
        time: model.block_time,
        asset: match model.asset {
            AssetTypeDb::Usdc => AssetType::Usdc,
            AssetTypeDb::Sol => AssetType::Sol,
        },
    }
}
