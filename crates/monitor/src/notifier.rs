use std::time::Duration;

use async_trait::async_trait;
use transfer_watch_domain::model::{NotificationPayload, TransactionRecord};

use crate::session::MonitorError;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Forwards freshly stored transactions to a downstream consumer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, transactions: &[TransactionRecord]) -> Result<(), MonitorError>;
}

/// Posts `{"transactions": [...]}` to the listener's `/notify` endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|err| MonitorError::Notify(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, transactions: &[TransactionRecord]) -> Result<(), MonitorError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let payload = NotificationPayload {
            transactions: transactions.to_vec(),
        };
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MonitorError::Notify(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batches_are_not_sent() {
        // Nothing listens on the discard port, so a real request would fail.
        let notifier = HttpNotifier::new("http://127.0.0.1:9/notify").unwrap();
        assert!(notifier.notify(&[]).await.is_ok());
        assert_eq!(notifier.url(), "http://127.0.0.1:9/notify");
    }
}
