//! Webhook ingestion - exactly-once application of processor events
//!
//! The processor delivers events at least once; replays are expected and
//! absorbed silently. The idempotency set lives on the account record and is
//! updated in the same atomic unit as the balance, so a replay can never
//! slip in between.

use std::sync::Arc;

use paymesh_ledger::CreditLedger;
use paymesh_types::{AccountId, HoldId, PayMeshError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::EscrowFlow;

/// Kind of processor event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventKind {
    /// A top-up completed; credit the account
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    /// Funds for a hold are confirmed reserved
    #[serde(rename = "hold.confirmed")]
    HoldConfirmed,
    /// Anything else the processor emits; acknowledged and ignored
    #[serde(other)]
    Other,
}

/// A processor event as it arrives on the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: WebhookEventKind,
    #[serde(default)]
    pub account_ref: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub hold_id: Option<String>,
}

/// Outcome of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookOutcome {
    pub applied: bool,
}

/// Applies processor events to the ledger and the escrow flow
#[derive(Clone)]
pub struct WebhookIngestor {
    ledger: CreditLedger,
    flow: Arc<EscrowFlow>,
}

impl WebhookIngestor {
    pub fn new(ledger: CreditLedger, flow: Arc<EscrowFlow>) -> Self {
        Self { ledger, flow }
    }

    /// Apply a completed top-up exactly once
    ///
    /// Resolves the account by id or fallback reference; an unknown
    /// reference becomes a fresh account (first top-up creates).
    pub async fn apply(
        &self,
        event_id: &str,
        account_ref: &str,
        amount: Decimal,
    ) -> Result<WebhookOutcome> {
        let account_id = match self.ledger.resolve(account_ref).await {
            Ok(id) => id,
            Err(PayMeshError::AccountNotFound { .. }) => AccountId::from_string(account_ref),
            Err(e) => return Err(e),
        };

        let outcome = self
            .ledger
            .credit(
                &account_id,
                amount,
                Some(event_id.to_string()),
                format!("top-up via processor event {event_id}"),
            )
            .await?;

        if outcome.applied {
            info!(%event_id, account = %account_id, %amount, "webhook credit applied");
        } else {
            info!(%event_id, account = %account_id, "webhook skipped (already processed)");
        }
        Ok(WebhookOutcome {
            applied: outcome.applied,
        })
    }

    /// Route an event by type
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        match event.kind {
            WebhookEventKind::PaymentCompleted => {
                let account_ref =
                    event
                        .account_ref
                        .as_deref()
                        .ok_or_else(|| PayMeshError::InvalidEvent {
                            message: format!("{} has no account_ref", event.event_id),
                        })?;
                let amount = event.amount.ok_or_else(|| PayMeshError::InvalidEvent {
                    message: format!("{} has no amount", event.event_id),
                })?;
                self.apply(&event.event_id, account_ref, amount).await
            }
            WebhookEventKind::HoldConfirmed => {
                let hold_id = event.hold_id.as_deref().ok_or_else(|| {
                    PayMeshError::InvalidEvent {
                        message: format!("{} has no hold_id", event.event_id),
                    }
                })?;
                self.flow
                    .mark_funds_held(&HoldId::from_string(hold_id))
                    .await?;
                Ok(WebhookOutcome { applied: true })
            }
            WebhookEventKind::Other => {
                debug!(event_id = %event.event_id, "ignoring unhandled event type");
                Ok(WebhookOutcome { applied: false })
            }
        }
    }
}
