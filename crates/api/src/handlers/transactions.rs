use actix_web::{web, HttpResponse};
use metrics::counter;

use crate::state::AppState;

use super::ApiError;

/// `GET /transactions/{count}`: the `count` most recent stored transfers,
/// newest first.
pub async fn transactions_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let raw = path.into_inner();
    let count = raw.trim().parse::<u64>().map_err(|_| {
        counter!("api_transactions_requests_total", "status" => "invalid_count").increment(1);
        ApiError::InvalidCount(raw.clone())
    })?;

    let records = state.storage().recent(count).await.inspect_err(|_| {
        counter!("api_transactions_requests_total", "status" => "error").increment(1);
    })?;

    counter!("api_transactions_requests_total", "status" => "ok").increment(1);
    Ok(HttpResponse::Ok().json(records))
}
