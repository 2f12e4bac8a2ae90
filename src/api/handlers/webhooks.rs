use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::json;

use crate::{api::state::AppState, error::Result};

/// Midtrans posts JSON; its signature lives inside the body
/// (`signature_key`), so plain JSON extraction is fine here.
pub async fn midtrans(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let outcome = state.services.webhook_service.handle_midtrans(payload).await?;
    Ok(Json(json!({ "ok": true, "result": outcome })))
}

/// iPaymu signs the raw body and sends the signature as a header, so the
/// body must reach the verifier byte-for-byte as it arrived.
pub async fn ipaymu(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers.get("signature").and_then(|v| v.to_str().ok());

    let outcome = state
        .services
        .webhook_service
        .handle_ipaymu(&body, signature)
        .await?;
    Ok(Json(json!({ "ok": true, "result": outcome })))
}
