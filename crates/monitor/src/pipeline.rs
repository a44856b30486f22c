use metrics::counter;
use tracing::{debug, info};
use transfer_watch_domain::model::TransactionRecord;
use transfer_watch_domain::storage::TransactionStore;

use crate::session::MonitorError;

/// Persists an observed transfer unless its hash is already stored.
///
/// Returns the record when it was newly inserted, `None` when it was already
/// known. The existence check and the insert are separate round trips; a
/// concurrent writer that wins the race is absorbed by the store's
/// `ON CONFLICT DO NOTHING` and reported here as "already known".
pub async fn record_transfer<S>(
    storage: &S,
    record: TransactionRecord,
) -> Result<Option<TransactionRecord>, MonitorError>
where
    S: TransactionStore + ?Sized,
{
    if storage.exists(&record.tx_hash).await? {
        debug!(tx_hash = %record.tx_hash, "transaction already stored");
        counter!("monitor_transactions_ingested_total", "result" => "duplicate").increment(1);
        return Ok(None);
    }

    if !storage.insert(record.clone()).await? {
        debug!(tx_hash = %record.tx_hash, "transaction stored concurrently");
        counter!("monitor_transactions_ingested_total", "result" => "duplicate").increment(1);
        return Ok(None);
    }

    info!(
        tx_hash = %record.tx_hash,
        asset = %record.asset,
        amount = record.amount,
        "new transaction stored"
    );
    counter!("monitor_transactions_ingested_total", "result" => "persisted").increment(1);
    Ok(Some(record))
}
