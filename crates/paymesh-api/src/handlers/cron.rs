//! Scheduled-maintenance handlers
//!
//! The trigger is an external scheduler presenting a shared secret header;
//! the scheduling mechanism itself lives outside this system.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use paymesh_escrow::{ReconcileReport, SweepReport};

use crate::{ApiError, ApiResult, AppState};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn require_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if state.config.cron_secret.is_empty() || presented != Some(state.config.cron_secret.as_str()) {
        return Err(ApiError::CronUnauthorized);
    }
    Ok(())
}

/// GET /sweep - release holds past the dead-man-switch TTL
pub async fn sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SweepReport>> {
    require_cron_secret(&state, &headers)?;
    let report = state.reaper.sweep(state.config.hold_ttl).await;
    Ok(Json(report))
}

/// GET /reconcile - repair captured-but-unmarked holds
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ReconcileReport>> {
    require_cron_secret(&state, &headers)?;
    let report = state.flow.reconcile().await;
    Ok(Json(report))
}
