//! Escrow handlers - authorize and finalize

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use paymesh_types::{AccountId, HoldId, SignedUrl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub account: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub hold_id: String,
    pub client_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub artifact_ref: SignedUrl,
}

/// POST /authorize - place a manual-capture hold
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let owner = AccountId::from_string(body.account);
    let hold = state.flow.authorize(&owner, body.amount).await?;
    Ok(Json(AuthorizeResponse {
        hold_id: hold.id.to_string(),
        client_secret: hold.client_secret,
    }))
}

/// POST /finalize/{hold_id} - deliver and capture
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Path(hold_id): Path<String>,
    Json(body): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let artifact_ref = state
        .flow
        .finalize(&HoldId::from_string(hold_id), &body.payload)
        .await?;
    Ok(Json(FinalizeResponse { artifact_ref }))
}
