//! Account and per-call billing handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use paymesh_types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub id: String,
    #[serde(default)]
    pub external_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: String,
    pub balance: Decimal,
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebitRequest {
    pub account: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: Decimal,
}

/// POST /accounts - signup-path account creation
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let account = state
        .ledger
        .create_account(AccountId::from_string(body.id), body.external_ref)
        .await?;
    Ok(Json(AccountResponse {
        account: account.id.to_string(),
        balance: account.balance,
        active: account.active,
    }))
}

/// GET /accounts/{account}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    let account_id = state.ledger.resolve(&account).await?;
    let balance = state.ledger.balance(&account_id).await?;
    let active = state
        .ledger
        .account(&account_id)
        .await
        .map(|a| a.active)
        .unwrap_or(false);
    Ok(Json(AccountResponse {
        account: account_id.to_string(),
        balance,
        active,
    }))
}

/// POST /debit - atomic per-call billing
pub async fn debit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DebitRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    let account_id = AccountId::from_string(body.account);
    let balance = state
        .ledger
        .debit(&account_id, body.amount, "service charge")
        .await?;
    Ok(Json(BalanceResponse {
        account: account_id.to_string(),
        balance,
    }))
}
