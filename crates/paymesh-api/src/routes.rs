//! API Routes

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Build the full router over shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // General
        .route("/health", get(handlers::health::health))
        // Accounts & billing
        .route("/accounts", post(handlers::billing::create_account))
        .route("/accounts/:account", get(handlers::billing::get_account))
        .route("/debit", post(handlers::billing::debit))
        // Escrow
        .route("/authorize", post(handlers::escrow::authorize))
        .route("/finalize/:hold_id", post(handlers::escrow::finalize))
        // Processor callbacks
        .route("/webhook", post(handlers::webhook::webhook))
        // Scheduled maintenance (authenticated by shared secret)
        .route("/sweep", get(handlers::cron::sweep))
        .route("/reconcile", get(handlers::cron::reconcile))
        // Capability handshake & discovery
        .route("/handshake", post(handlers::handshake::handshake))
        .route("/discover", get(handlers::handshake::discover))
        .with_state(state)
}
