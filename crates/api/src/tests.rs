use std::sync::atomic::{AtomicUsize, Ordering};
use std::{sync::Arc, time::Duration};

use actix_web::{body::to_bytes, http::StatusCode, test, web, App};
use async_trait::async_trait;
use transfer_watch_domain::model::{AssetType, TransactionRecord, WatchedAddress};
use transfer_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use transfer_watch_domain::storage::TransactionStore;
use transfer_watch_monitor::{
    MonitorError, MonitorServices, MonitorSettings, Notifier, SessionRegistry, TransferSource,
};
use transfer_watch_storage::SeaOrmStorage;

use crate::application::configure_routes;
use crate::handlers::{
    monitor::{MonitorRequest, MonitorResponse, MonitorTransactions},
    ErrorBody,
};
use crate::state::AppState;

const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

#[derive(Default)]
struct StubSource {
    calls: Arc<AtomicUsize>,
    transfer: Option<TransactionRecord>,
}

#[async_trait]
impl TransferSource for StubSource {
    async fn latest_transfer(
        &self,
        _recipient: &WatchedAddress,
        asset: AssetType,
    ) -> Result<Option<TransactionRecord>, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .transfer
            .clone()
            .filter(|record| record.asset == asset))
    }
}

#[derive(Default)]
struct CountingNotifier {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _transactions: &[TransactionRecord]) -> Result<(), MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn storage() -> SeaOrmStorage {
    SeaOrmStorage::connect("sqlite::memory:")
        .await
        .expect("storage inits")
}

fn telemetry() -> TelemetryGuard {
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

fn settings() -> MonitorSettings {
    MonitorSettings {
        poll_interval: Duration::from_millis(10),
        timeout: Duration::from_millis(60),
    }
}

fn record(hash: &str, time: i64, asset: AssetType) -> TransactionRecord {
    TransactionRecord {
        tx_hash: hash.to_string(),
        from: "Sender".into(),
        to: RECIPIENT.into(),
        amount: 2.5,
        address: RECIPIENT.into(),
        time,
        asset,
    }
}

fn build_state(storage: SeaOrmStorage, source: StubSource, notifier: CountingNotifier) -> AppState {
    let services = MonitorServices::new(Arc::new(source), Arc::new(storage), Arc::new(notifier));
    AppState::new(services, settings(), SessionRegistry::new(), telemetry())
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(|cfg| configure_routes(cfg, true)),
        )
        .await
    };
}

fn monitor_request(recipient: Option<&str>, asset: Option<&str>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/monitor")
        .set_json(&MonitorRequest {
            recipient: recipient.map(str::to_string),
            asset: asset.map(str::to_string),
        })
}

#[actix_web::test]
async fn missing_recipient_is_rejected_without_polling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = StubSource {
        calls: calls.clone(),
        ..Default::default()
    };
    let app = app!(build_state(storage().await, source, CountingNotifier::default()));

    let resp = test::call_service(&app, monitor_request(None, Some("USDC")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(parsed.error.contains("recipient"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn malformed_address_and_unknown_type_are_rejected() {
    let app = app!(build_state(
        storage().await,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let resp = test::call_service(&app, monitor_request(Some("not-a-key"), None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
        test::call_service(&app, monitor_request(Some(RECIPIENT), Some("BTC")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_uses_error_body() {
    let app = app!(build_state(
        storage().await,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let req = test::TestRequest::post()
        .uri("/monitor")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(parsed.error.starts_with("invalid request body"));
}

#[actix_web::test]
async fn new_transfer_is_stored_and_returned() {
    let storage = storage().await;
    let notified = Arc::new(AtomicUsize::new(0));
    let source = StubSource {
        transfer: Some(record("sig-usdc", 1_700_000_000, AssetType::Usdc)),
        ..Default::default()
    };
    let notifier = CountingNotifier {
        calls: notified.clone(),
    };
    let app = app!(build_state(storage.clone(), source, notifier));

    let resp = test::call_service(&app, monitor_request(Some(RECIPIENT), None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: MonitorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.action, "newTransactions");
    match parsed.transactions {
        MonitorTransactions::Records(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].tx_hash, "sig-usdc");
        }
        other => panic!("unexpected transactions payload: {other:?}"),
    }

    assert_eq!(storage.recent(10).await.unwrap().len(), 1);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn already_stored_transfer_times_out() {
    let storage = storage().await;
    storage
        .insert(record("sig-sol", 1_700_000_000, AssetType::Sol))
        .await
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let notified = Arc::new(AtomicUsize::new(0));
    let source = StubSource {
        calls: calls.clone(),
        transfer: Some(record("sig-sol", 1_700_000_000, AssetType::Sol)),
    };
    let notifier = CountingNotifier {
        calls: notified.clone(),
    };
    let app = app!(build_state(storage.clone(), source, notifier));

    let resp =
        test::call_service(&app, monitor_request(Some(RECIPIENT), Some("SOL")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: MonitorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.action, "NoLatestTx");
    match parsed.transactions {
        MonitorTransactions::Message(message) => assert!(message.contains("No new SOL transaction")),
        other => panic!("unexpected transactions payload: {other:?}"),
    }

    assert_eq!(storage.recent(10).await.unwrap().len(), 1);
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    // The timer is gone once the response is out.
    let polls = calls.load(Ordering::SeqCst);
    assert!(polls >= 1);
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(calls.load(Ordering::SeqCst), polls);
}

#[actix_web::test]
async fn recent_transactions_are_limited_and_ordered() {
    let storage = storage().await;
    for offset in 0..7 {
        storage
            .insert(record(&format!("sig-{offset}"), 1_700_000_000 + offset, AssetType::Usdc))
            .await
            .unwrap();
    }
    let app = app!(build_state(
        storage,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let req = test::TestRequest::get().uri("/transactions/5").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let records: Vec<TransactionRecord> = serde_json::from_slice(&body).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].tx_hash, "sig-6");
    assert!(records.windows(2).all(|pair| pair[0].time >= pair[1].time));
}

#[actix_web::test]
async fn non_numeric_count_is_rejected() {
    let app = app!(build_state(
        storage().await,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let req = test::TestRequest::get().uri("/transactions/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/transactions/-1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn maximal_count_returns_every_record() {
    let storage = storage().await;
    storage
        .insert(record("sig-only", 1_700_000_000, AssetType::Sol))
        .await
        .unwrap();
    let app = app!(build_state(
        storage,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let req = test::TestRequest::get()
        .uri("/transactions/18446744073709551615")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let records: Vec<TransactionRecord> = serde_json::from_slice(&body).unwrap();
    assert_eq!(records.len(), 1);
}

#[actix_web::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let app = app!(build_state(
        storage().await,
        StubSource::default(),
        CountingNotifier::default()
    ));

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}
