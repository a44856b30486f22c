use std::str::FromStr;

use actix_web::{web, HttpResponse};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;
use transfer_watch_domain::model::{AssetType, TransactionRecord, WatchedAddress};
use transfer_watch_monitor::{MonitorOutcome, MonitorSession};

use crate::state::AppState;

use super::ApiError;

pub const ACTION_NEW_TRANSACTIONS: &str = "newTransactions";
pub const ACTION_NO_LATEST_TX: &str = "NoLatestTx";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MonitorRequest {
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default, rename = "type")]
    pub asset: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub action: String,
    pub transactions: MonitorTransactions,
}

/// Either the freshly stored records or, on timeout, a human-readable note.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonitorTransactions {
    Records(Vec<TransactionRecord>),
    Message(String),
}

/// `POST /monitor`: holds the request open until a new transfer to the
/// recipient is stored or the monitor timeout elapses.
pub async fn monitor_handler(
    state: web::Data<AppState>,
    payload: web::Json<MonitorRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let (recipient, asset) = parse_request(&request).inspect_err(|_| {
        counter!("monitor_requests_total", "result" => "invalid").increment(1);
    })?;

    let ticket = state.registry().enter(&recipient);
    let mut session = MonitorSession::new(recipient, asset, state.settings());
    let outcome = session.run(state.services()).await.inspect_err(|_| {
        counter!("monitor_requests_total", "result" => "error").increment(1);
    })?;

    let response = match outcome {
        MonitorOutcome::Found(records) => {
            counter!("monitor_requests_total", "result" => "found").increment(1);
            info!(
                recipient = %session.recipient(),
                count = records.len(),
                concurrent_sessions = ticket.concurrent(),
                "monitor request answered with new transactions"
            );
            MonitorResponse {
                action: ACTION_NEW_TRANSACTIONS.to_string(),
                transactions: MonitorTransactions::Records(records),
            }
        }
        MonitorOutcome::TimedOut => {
            counter!("monitor_requests_total", "result" => "timed_out").increment(1);
            info!(
                recipient = %session.recipient(),
                concurrent_sessions = ticket.concurrent(),
                "monitor request answered without new transactions"
            );
            MonitorResponse {
                action: ACTION_NO_LATEST_TX.to_string(),
                transactions: MonitorTransactions::Message(no_latest_message(asset)),
            }
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

fn parse_request(
    request: &MonitorRequest,
) -> Result<(WatchedAddress, Option<AssetType>), ApiError> {
    let recipient = request
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingRecipient)?;
    let recipient = WatchedAddress::parse(recipient)?;

    let asset = match request.asset.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            AssetType::from_str(raw).map_err(|_| ApiError::InvalidAssetType(raw.to_string()))?,
        ),
    };

    Ok((recipient, asset))
}

pub(crate) fn no_latest_message(asset: Option<AssetType>) -> String {
    let label = asset.map_or("USDC and SOL", AssetType::as_str);
    format!(
        "No new {label} transaction, the latest {label} transaction already returned before and stored in the database"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn request(recipient: Option<&str>, asset: Option<&str>) -> MonitorRequest {
        MonitorRequest {
            recipient: recipient.map(str::to_string),
            asset: asset.map(str::to_string),
        }
    }

    #[test]
    fn parses_recipient_and_optional_type() {
        let (recipient, asset) = parse_request(&request(Some(RECIPIENT), Some("sol"))).unwrap();
        assert_eq!(recipient.as_str(), RECIPIENT);
        assert_eq!(asset, Some(AssetType::Sol));

        let (_, asset) = parse_request(&request(Some(RECIPIENT), None)).unwrap();
        assert_eq!(asset, None);
    }

    #[test]
    fn rejects_missing_or_blank_recipient() {
        assert!(matches!(
            parse_request(&request(None, None)),
            Err(ApiError::MissingRecipient)
        ));
        assert!(matches!(
            parse_request(&request(Some("   "), None)),
            Err(ApiError::MissingRecipient)
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(matches!(
            parse_request(&request(Some(RECIPIENT), Some("BTC"))),
            Err(ApiError::InvalidAssetType(_))
        ));
    }

    #[test]
    fn message_names_the_polled_assets() {
        assert!(no_latest_message(Some(AssetType::Usdc)).starts_with("No new USDC transaction"));
        assert!(no_latest_message(None).contains("USDC and SOL"));
    }
}
