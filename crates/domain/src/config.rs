//! Environment-driven configuration structures shared by all binaries.

use std::{env, time::Duration};

use thiserror::Error;

/// USDC mint on Solana devnet, used when `USDC_MINT_ADDRESS` is not set.
pub const DEFAULT_USDC_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";
pub const DEFAULT_NOTIFY_URL: &str = "http://localhost:6013/notify";
pub const DEFAULT_COMMITMENT: &str = "confirmed";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MONITOR_TIMEOUT_SECS: u64 = 60;

/// Configuration for the monitor API binary: HTTP bind, database, chain RPC
/// endpoint, downstream listener and polling cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    database_url: String,
    api_bind_address: String,
    api_unix_socket: Option<String>,
    solana_rpc_url: String,
    notify_url: String,
    usdc_mint_address: String,
    commitment: String,
    poll_interval: Duration,
    monitor_timeout: Duration,
}

impl ApiConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// process variables. Missing or malformed entries surface as
    /// `ConfigError` so the binary can refuse to boot.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let poll_interval =
            get_duration_secs("MONITOR_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let monitor_timeout =
            get_duration_secs("MONITOR_TIMEOUT_SECS", DEFAULT_MONITOR_TIMEOUT_SECS)?;

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            api_unix_socket: get_optional_var("API_UNIX_SOCKET"),
            solana_rpc_url: get_required_var("SOLANA_RPC_URL")?,
            notify_url: get_optional_var("NOTIFY_URL")
                .unwrap_or_else(|| DEFAULT_NOTIFY_URL.to_string()),
            usdc_mint_address: get_optional_var("USDC_MINT_ADDRESS")
                .unwrap_or_else(|| DEFAULT_USDC_MINT.to_string()),
            commitment: get_optional_var("SOLANA_COMMITMENT")
                .unwrap_or_else(|| DEFAULT_COMMITMENT.to_string()),
            poll_interval,
            monitor_timeout,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn api_unix_socket(&self) -> Option<&str> {
        self.api_unix_socket.as_deref()
    }

    pub fn solana_rpc_url(&self) -> &str {
        &self.solana_rpc_url
    }

    pub fn notify_url(&self) -> &str {
        &self.notify_url
    }

    pub fn usdc_mint_address(&self) -> &str {
        &self.usdc_mint_address
    }

    pub fn commitment(&self) -> &str {
        &self.commitment
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn monitor_timeout(&self) -> Duration {
        self.monitor_timeout
    }
}

/// Listener binary only needs somewhere to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    bind_address: String,
}

impl ListenerConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            bind_address: get_required_var("LISTENER_BIND_ADDRESS")?,
        })
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn get_duration_secs(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = match get_optional_var(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|source| ConfigError::InvalidNumber { key, source })?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidDuration { key });
    }
    Ok(Duration::from_secs(secs))
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("TRANSFER_WATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("`{key}` must be greater than zero")]
    InvalidDuration { key: &'static str },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
