//! Capability handshake and discovery handlers
//!
//! The handshake bills the payer a flat fee, then issues a short-lived
//! capability token for the target agent. If issuance fails after the debit
//! went through, the debit is refunded - the fee must never outlive the
//! work it paid for.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use paymesh_capability::AgentCandidate;
use paymesh_types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Paying account
    pub payer: String,
    /// Target agent identity the token is minted for
    pub target: String,
    /// Capability the payer wants to invoke
    pub capability: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub session_token: String,
    pub remaining_balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    pub capability: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub agents: Vec<AgentCandidate>,
}

/// POST /handshake - debit the fee, then issue a capability token
pub async fn handshake(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HandshakeRequest>,
) -> ApiResult<Json<HandshakeResponse>> {
    let payer = AccountId::from_string(body.payer);
    let remaining_balance = state
        .ledger
        .debit(
            &payer,
            state.config.handshake_fee,
            format!("capability handshake: {}", body.capability),
        )
        .await?;

    let session_token = match state.tokens.issue(
        payer.as_str(),
        &body.target,
        &body.capability,
        state.config.handshake_token_ttl,
    ) {
        Ok(token) => token,
        Err(e) => {
            // Compensate the debit; the caller paid for nothing
            if let Err(refund_err) = state
                .ledger
                .refund(&payer, state.config.handshake_fee, "handshake issuance failed")
                .await
            {
                warn!(error = %refund_err, "failed to refund handshake fee");
            }
            return Err(e.into());
        }
    };

    Ok(Json(HandshakeResponse {
        session_token,
        remaining_balance,
    }))
}

/// GET /discover?capability= - candidate list from the external index
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> ApiResult<Json<DiscoverResponse>> {
    let agents = state.index.search(&params.capability).await?;
    Ok(Json(DiscoverResponse { agents }))
}
