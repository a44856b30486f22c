use actix_web::{middleware::Logger, web, App, HttpServer};
use thiserror::Error;
use tracing::info;
use transfer_watch_domain::config::{ConfigError, ListenerConfig};
use transfer_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};

use crate::handlers::{metrics_handler, notify_handler, ListenerError};

pub async fn run() -> Result<(), BootstrapError> {
    // Configuration and telemetry come first so later failures are logged.
    let config = ListenerConfig::load_from_env()?;
    let telemetry = init_telemetry(&TelemetryConfig::from_env("LISTENER"))?;
    let expose_metrics = telemetry.expose_metrics();

    info!(bind_address = config.bind_address(), "notification listener starting");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(telemetry.clone()))
            .wrap(Logger::default())
            .configure(|cfg| configure_routes(cfg, expose_metrics))
    })
    .bind(config.bind_address())?
    .run()
    .await?;

    Ok(())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, expose_metrics: bool) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ListenerError::InvalidBody(err.to_string()).into()),
    )
    .route("/notify", web::post().to(notify_handler));

    if expose_metrics {
        cfg.route("/metrics", web::get().to(metrics_handler));
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
