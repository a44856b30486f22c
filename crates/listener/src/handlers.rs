use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use transfer_watch_domain::model::NotificationPayload;
use transfer_watch_domain::services::telemetry::TelemetryGuard;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("no transactions provided")]
    EmptyBatch,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ResponseError for ListenerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
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

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyAck {
    pub received: usize,
}

/// `POST /notify`: accepts a batch of new transfers from the monitor and
/// logs each one.
pub async fn notify_handler(
    payload: web::Json<NotificationPayload>,
) -> Result<HttpResponse, ListenerError> {
    let NotificationPayload { transactions } = payload.into_inner();
    if transactions.is_empty() {
        counter!("listener_notifications_total", "status" => "empty").increment(1);
        return Err(ListenerError::EmptyBatch);
    }

    for record in &transactions {
        info!(
            tx_hash = %record.tx_hash,
            from = %record.from,
            to = %record.to,
            amount = record.amount,
            asset = %record.asset,
            block_time = ?record.block_time(),
            "transaction notification received"
        );
    }

    counter!("listener_notifications_total", "status" => "accepted").increment(1);
    Ok(HttpResponse::Ok().json(NotifyAck {
        received: transactions.len(),
    }))
}

pub async fn metrics_handler(telemetry: web::Data<TelemetryGuard>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(telemetry.render_metrics())
}
