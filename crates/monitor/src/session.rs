use std::{sync::Arc, time::Duration};

use metrics::counter;
use solana_client::client_error::ClientError;
use thiserror::Error;
use tokio::time::{interval, sleep_until, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use transfer_watch_domain::{
    config::ApiConfig,
    model::{AssetType, TransactionRecord, WatchedAddress},
    storage::{StorageError, TransactionStore},
};

use crate::{notifier::Notifier, pipeline::record_transfer, rpc::TransferSource};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("notification error: {0}")]
    Notify(String),
    #[error("invalid monitor setting: {0}")]
    InvalidSetting(String),
    #[error("monitor session already produced its response")]
    AlreadyResponded,
}

impl From<ClientError> for MonitorError {
    fn from(value: ClientError) -> Self {
        Self::Rpc(value.to_string())
    }
}

/// Polling cadence and overall budget of one monitor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.monitor_timeout(),
        }
    }
}

/// Collaborators a session polls, writes to and notifies.
#[derive(Clone)]
pub struct MonitorServices {
    source: Arc<dyn TransferSource>,
    store: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
}

impl MonitorServices {
    pub fn new(
        source: Arc<dyn TransferSource>,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
        }
    }

    pub fn store(&self) -> &dyn TransactionStore {
        self.store.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Started,
    Polling,
    Found,
    TimedOut,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Found | SessionState::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    /// Transactions stored during the tick that ended the session.
    Found(Vec<TransactionRecord>),
    TimedOut,
}

/// Per-request monitoring context. Everything a tick needs to know about the
/// request lives here rather than in shared state: the recipient, which
/// assets to poll, the lifecycle state, whether the response has been
/// produced, and the token that stops further ticks.
pub struct MonitorSession {
    recipient: WatchedAddress,
    asset_filter: Option<AssetType>,
    assets: Vec<AssetType>,
    settings: MonitorSettings,
    state: SessionState,
    responded: bool,
    cancel: CancellationToken,
}

impl MonitorSession {
    pub fn new(
        recipient: WatchedAddress,
        asset_filter: Option<AssetType>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            recipient,
            asset_filter,
            assets: AssetType::selection(asset_filter),
            settings,
            state: SessionState::Started,
            responded: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn recipient(&self) -> &WatchedAddress {
        &self.recipient
    }

    pub fn asset_filter(&self) -> Option<AssetType> {
        self.asset_filter
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Token cancelled once the session reaches a terminal state. Cancelling
    /// it from outside ends the session at its next check.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Polls until a tick stores at least one new transaction or the timeout
    /// elapses. A session yields exactly one outcome; running it again fails
    /// with `MonitorError::AlreadyResponded`.
    pub async fn run(&mut self, services: &MonitorServices) -> Result<MonitorOutcome, MonitorError> {
        if self.responded {
            return Err(MonitorError::AlreadyResponded);
        }

        self.state = SessionState::Polling;
        info!(
            recipient = %self.recipient,
            assets = ?self.assets,
            "monitoring started"
        );

        let cancel = self.cancel.clone();
        let deadline = Instant::now() + self.settings.timeout;
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(self.finish(MonitorOutcome::TimedOut));
                }
                _ = sleep_until(deadline) => {
                    info!(recipient = %self.recipient, "monitoring ended due to timeout");
                    return Ok(self.finish(MonitorOutcome::TimedOut));
                }
                _ = ticker.tick() => {}
            }

            // A tick still in flight at the deadline is abandoned; the next
            // loop turn reports the timeout.
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                polled = timeout_at(deadline, self.tick(services)) => polled.ok(),
            };
            if let Some(fresh) = polled.filter(|fresh| !fresh.is_empty()) {
                return Ok(self.finish(MonitorOutcome::Found(fresh)));
            }
        }
    }

    /// One poll per selected asset, storing anything new and notifying the
    /// listener once per tick. Failures degrade to "nothing this tick".
    async fn tick(&self, services: &MonitorServices) -> Vec<TransactionRecord> {
        let mut fresh = Vec::new();

        for &asset in &self.assets {
            if self.cancel.is_cancelled() {
                break;
            }

            let observed = match services
                .source
                .latest_transfer(&self.recipient, asset)
                .await
            {
                Ok(Some(record)) => {
                    counter!("monitor_polls_total", "asset" => asset.as_str(), "result" => "found")
                        .increment(1);
                    record
                }
                Ok(None) => {
                    counter!("monitor_polls_total", "asset" => asset.as_str(), "result" => "empty")
                        .increment(1);
                    debug!(recipient = %self.recipient, %asset, "no matching transfer");
                    continue;
                }
                Err(err) => {
                    counter!("monitor_polls_total", "asset" => asset.as_str(), "result" => "error")
                        .increment(1);
                    warn!(recipient = %self.recipient, %asset, %err, "transfer lookup failed");
                    continue;
                }
            };

            match record_transfer(services.store.as_ref(), observed).await {
                Ok(Some(stored)) => {
                    info!(
                        recipient = %self.recipient,
                        tx_hash = %stored.tx_hash,
                        %asset,
                        "new transaction detected"
                    );
                    fresh.push(stored);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(recipient = %self.recipient, %asset, %err, "failed to persist transfer");
                }
            }
        }

        if !fresh.is_empty() {
            match services.notifier.notify(&fresh).await {
                Ok(()) => {
                    counter!("monitor_notifications_total", "result" => "sent").increment(1);
                    info!(count = fresh.len(), "transaction notification sent");
                }
                Err(err) => {
                    counter!("monitor_notifications_total", "result" => "error").increment(1);
                    warn!(%err, "failed to notify listener");
                }
            }
        }

        fresh
    }

    fn finish(&mut self, outcome: MonitorOutcome) -> MonitorOutcome {
        self.state = match outcome {
            MonitorOutcome::Found(_) => SessionState::Found,
            MonitorOutcome::TimedOut => SessionState::TimedOut,
        };
        self.responded = true;
        self.cancel.cancel();
        outcome
    }
}
