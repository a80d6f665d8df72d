//! Processor webhook handler
//!
//! Signature and shape are validated first; after that the endpoint always
//! returns 200. The processor redelivers until it sees a 200, so replays and
//! events about records we do not recognize are acknowledged without effect.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use paymesh_escrow::WebhookEvent;
use paymesh_types::PayMeshError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{signature::verify_webhook_signature, ApiError, ApiResult, AppState};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub applied: bool,
}

/// POST /webhook
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidWebhookSignature)?;
    if !verify_webhook_signature(&state.config.webhook_secret, &body, signature) {
        return Err(ApiError::InvalidWebhookSignature);
    }

    let event: WebhookEvent =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidWebhookPayload)?;

    let applied = match state.ingestor.handle(event).await {
        Ok(outcome) => outcome.applied,
        // Shape errors are the sender's fault and worth a 400
        Err(e @ PayMeshError::InvalidEvent { .. }) => return Err(e.into()),
        // Anything else is ours; acknowledge so the processor stops retrying
        Err(e) => {
            warn!(error = %e, "webhook event absorbed without effect");
            false
        }
    };

    Ok(Json(WebhookResponse {
        received: true,
        applied,
    }))
}
