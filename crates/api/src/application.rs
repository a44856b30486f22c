use std::sync::Arc;

#[cfg(unix)]
use std::{fs, path::Path};

use actix_web::{middleware::Logger, web, App, HttpServer};
use thiserror::Error;
use tracing::info;
use transfer_watch_domain::config::{ApiConfig, ConfigError};
use transfer_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use transfer_watch_domain::storage::StorageError;
use transfer_watch_monitor::{
    build_rpc_source, HttpNotifier, MonitorError, MonitorServices, MonitorSettings,
    SessionRegistry,
};
use transfer_watch_storage::SeaOrmStorage;

use crate::{
    handlers::{metrics_handler, monitor_handler, transactions_handler, ApiError},
    state::AppState,
};

pub async fn run() -> Result<(), BootstrapError> {
    // Configuration and telemetry come first so later failures are logged.
    let config = ApiConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    // Dedup store, migrated on connect.
    let storage = SeaOrmStorage::connect(config.database_url()).await?;

    // Chain lookups and listener delivery.
    let source = build_rpc_source(&config)?;
    let notifier = HttpNotifier::new(config.notify_url())?;
    let settings = MonitorSettings::from_config(&config);

    info!(
        notify_url = notifier.url(),
        poll_interval_secs = settings.poll_interval.as_secs(),
        timeout_secs = settings.timeout.as_secs(),
        "api configured"
    );

    let services = MonitorServices::new(Arc::new(source), Arc::new(storage), Arc::new(notifier));

    // Shared state cloned into every worker.
    let state = AppState::new(services, settings, SessionRegistry::new(), telemetry.clone());
    let expose_metrics = telemetry.expose_metrics();

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(|cfg| configure_routes(cfg, expose_metrics))
    });

    // Unix socket when configured, TCP otherwise.
    #[cfg(unix)]
    {
        if let Some(socket) = config.api_unix_socket() {
            cleanup_socket(socket)?;
            server = server.bind_uds(socket)?;
        } else {
            server = server.bind(config.api_bind_address())?;
        }
    }

    #[cfg(not(unix))]
    {
        if let Some(socket) = config.api_unix_socket() {
            return Err(BootstrapError::Io(std::io::Error::other(format!(
                "unix socket '{socket}' requested but this platform does not support it"
            ))));
        }
        server = server.bind(config.api_bind_address())?;
    }

    server.run().await?;
    Ok(())
}

/// Registers the public routes. Malformed JSON bodies are reported through
/// `ApiError` so every 4xx shares the `{"error": ...}` shape.
pub fn configure_routes(cfg: &mut web::ServiceConfig, expose_metrics: bool) {
    cfg.app_data(json_config())
        .route("/monitor", web::post().to(monitor_handler))
        .route("/transactions/{count}", web::get().to(transactions_handler));

    if expose_metrics {
        cfg.route("/metrics", web::get().to(metrics_handler));
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A socket file left behind by an unclean shutdown makes `bind_uds` fail.
#[cfg(unix)]
fn cleanup_socket(path: &str) -> std::io::Result<()> {
    let socket_path = Path::new(path);
    if socket_path.exists() {
        fs::remove_file(socket_path)?;
    }
    Ok(())
}
