pub mod metrics;
pub mod monitor;
pub mod transactions;

pub use metrics::metrics_handler;
pub use monitor::monitor_handler;
pub use transactions::transactions_handler;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use transfer_watch_domain::model::AddressFormatError;
use transfer_watch_domain::storage::StorageError;
use transfer_watch_monitor::MonitorError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("recipient address is required")]
    MissingRecipient,
    #[error("invalid recipient address: {0}")]
    InvalidAddress(#[from] AddressFormatError),
    #[error("unsupported transaction type '{0}', expected USDC or SOL")]
    InvalidAssetType(String),
    #[error("invalid count '{0}', expected a non-negative integer")]
    InvalidCount(String),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor failure: {0}")]
    Monitor(#[from] MonitorError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingRecipient
            | ApiError::InvalidAddress(_)
            | ApiError::InvalidAssetType(_)
            | ApiError::InvalidCount(_)
            | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Monitor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
