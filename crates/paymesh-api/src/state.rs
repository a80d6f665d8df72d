//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use paymesh_capability::{DiscoveryIndex, TokenService};
use paymesh_escrow::{EscrowFlow, StaleHoldReaper, WebhookIngestor, DEFAULT_HOLD_TTL_SECS};
use paymesh_ledger::CreditLedger;
use rust_decimal::Decimal;

/// Static configuration for the API surface
#[derive(Clone)]
pub struct ApiConfig {
    /// Shared secret for webhook body signatures
    pub webhook_secret: String,
    /// Shared secret the external scheduler presents on /sweep and
    /// /reconcile
    pub cron_secret: String,
    /// Flat fee debited per capability handshake
    pub handshake_fee: Decimal,
    /// TTL of issued handshake tokens
    pub handshake_token_ttl: Duration,
    /// Dead-man-switch TTL for escrow holds
    pub hold_ttl: Duration,
}

impl ApiConfig {
    pub fn new(webhook_secret: impl Into<String>, cron_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            cron_secret: cron_secret.into(),
            handshake_fee: Decimal::new(10, 2), // $0.10
            handshake_token_ttl: Duration::from_secs(300),
            hold_ttl: Duration::from_secs(DEFAULT_HOLD_TTL_SECS),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub ledger: CreditLedger,
    pub flow: Arc<EscrowFlow>,
    pub ingestor: WebhookIngestor,
    pub reaper: StaleHoldReaper,
    pub tokens: TokenService,
    pub index: Arc<dyn DiscoveryIndex>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        ledger: CreditLedger,
        flow: Arc<EscrowFlow>,
        tokens: TokenService,
        index: Arc<dyn DiscoveryIndex>,
        config: ApiConfig,
    ) -> Self {
        let ingestor = WebhookIngestor::new(ledger.clone(), flow.clone());
        let reaper = StaleHoldReaper::new(flow.clone());
        Self {
            ledger,
            flow,
            ingestor,
            reaper,
            tokens,
            index,
            config,
        }
    }
}
