use std::{env, sync::Arc};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::hydrate_env_file;

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_HANDLE: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

/// Shared observability options for binaries.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    log_filter: String,
    expose_metrics: bool,
}

impl TelemetryConfig {
    /// Loads telemetry knobs from optional environment variables prefixed with
    /// `<PREFIX>_`, e.g. `API_LOG_FILTER`. Missing entries fall back to sane
    /// defaults so binaries do not require extra configuration to boot.
    pub fn from_env(prefix: &str) -> Self {
        let _ = hydrate_env_file();
        let upper = prefix.trim().to_ascii_uppercase();
        let log_key = format!("{}_LOG_FILTER", upper);
        let metrics_key = format!("{}_EXPOSE_METRICS", upper);

        let log_filter = env::var(log_key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "info".to_string());
        let expose_metrics = env::var(metrics_key)
            .ok()
            .map(|value| !matches!(value.trim(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            log_filter,
            expose_metrics,
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Whether binaries should mount `GET /metrics`.
    pub fn expose_metrics(&self) -> bool {
        self.expose_metrics
    }
}

/// Guard returned after telemetry initialization.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: Arc<PrometheusHandle>,
    expose_metrics: bool,
}

impl TelemetryGuard {
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }

    pub fn expose_metrics(&self) -> bool {
        self.expose_metrics
    }
}

/// Centralized helper to wire up tracing + the metrics recorder once per
/// process. Later calls reuse what the first call installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config)?;
    let metrics = install_metrics()?;

    Ok(TelemetryGuard {
        metrics,
        expose_metrics: config.expose_metrics(),
    })
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn install_metrics() -> Result<Arc<PrometheusHandle>, TelemetryError> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map(Arc::new)
                .map_err(|err| TelemetryError::Metrics(err.to_string()))
        })
        .cloned()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn telemetry_config_uses_defaults() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::remove_var("API_LOG_FILTER");
        env::remove_var("API_EXPOSE_METRICS");

        let cfg = TelemetryConfig::from_env("api");
        assert_eq!(cfg.log_filter(), "info");
        assert!(cfg.expose_metrics());
    }

    #[test]
    fn telemetry_config_reads_env() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::set_var("API_LOG_FILTER", "debug,sea_orm=warn");
        env::set_var("API_EXPOSE_METRICS", "false");

        let cfg = TelemetryConfig::from_env("API");
        assert_eq!(cfg.log_filter(), "debug,sea_orm=warn");
        assert!(!cfg.expose_metrics());

        env::remove_var("API_LOG_FILTER");
        env::remove_var("API_EXPOSE_METRICS");
    }

    #[test]
    fn blank_log_filter_falls_back_to_info() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::set_var("API_LOG_FILTER", "  ");
        let cfg = TelemetryConfig::from_env("API");
        assert_eq!(cfg.log_filter(), "info");
        env::remove_var("API_LOG_FILTER");
    }

    #[test]
    fn init_is_idempotent() {
        let _guard = ENV_GUARD.lock().unwrap();
        let cfg = TelemetryConfig::from_env("TELEMETRY_TEST");
        let _first = init_telemetry(&cfg).expect("first init");
        let second = init_telemetry(&cfg).expect("second init");
        metrics::counter!("telemetry_test_total").increment(1);
        assert!(second.render_metrics().contains("telemetry_test_total"));
    }
}
