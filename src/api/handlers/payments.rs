use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::{
    api::state::AppState,
    domain::Payment,
    error::{AppError, Result},
};

pub async fn get(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Payment>> {
    let payment = state
        .services
        .settlement_store
        .find_payment(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    Ok(Json(payment))
}

/// Live status probe against Midtrans, for support/ops checking where an
/// order stands before the webhook lands.
pub async fn gateway_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let client = state
        .services
        .midtrans_client
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Midtrans gateway is not enabled".to_string()))?;

    let result = client.transaction_status(&order_id).await?;
    Ok(Json(json!({ "ok": true, "result": result })))
}
