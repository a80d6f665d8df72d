//! The escrow state machine
//!
//! ```text
//! authorize ──► Authorized ──(processor webhook)──► FundsHeld
//!                  │                                   │
//!                  └──────────── finalize ─────────────┘
//!                                   │
//!                render → upload → capture → Delivered
//! ```
//!
//! Capture is the irreversible commit point and only happens after the
//! artifact is durably stored. A processor failure therefore never leaves a
//! captured-but-undelivered state; a stored artifact without capture is a
//! rare reconcilable loss, never a charge for a failed delivery.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use paymesh_types::{
    AccountId, CancelReason, EscrowHold, HoldId, HoldStatus, PayMeshError, Result, SignedUrl,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{ArtifactStore, PaymentProcessor, ProcessorHoldState};

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Holds found captured at the processor and marked Delivered locally
    pub recovered: usize,
    pub errors: Vec<String>,
}

/// The escrow flow
///
/// Holds are the only mutable state here; every transition goes through one
/// write-guard section on the hold map. Clones share state.
#[derive(Clone)]
pub struct EscrowFlow {
    processor: Arc<dyn PaymentProcessor>,
    artifacts: Arc<dyn ArtifactStore>,
    holds: Arc<RwLock<HashMap<HoldId, EscrowHold>>>,
}

impl EscrowFlow {
    pub fn new(processor: Arc<dyn PaymentProcessor>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            processor,
            artifacts,
            holds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Place a manual-capture hold for `amount` on behalf of `owner`
    ///
    /// Fails closed with `ManualCaptureRequired` when the processor does not
    /// confirm two-phase capture.
    pub async fn authorize(&self, owner: &AccountId, amount: Decimal) -> Result<EscrowHold> {
        if amount <= Decimal::ZERO {
            return Err(PayMeshError::invalid_amount(format!(
                "hold amount must be greater than zero, got {amount}"
            )));
        }

        let processor_hold = self.processor.create_hold(amount).await?;
        if !processor_hold.manual_capture {
            // Release the intent we just opened; best effort
            if let Err(e) = self.processor.cancel(&processor_hold.hold_id).await {
                warn!(hold_id = %processor_hold.hold_id, error = %e,
                    "failed to release auto-capture intent");
            }
            return Err(PayMeshError::ManualCaptureRequired {
                hold_id: processor_hold.hold_id,
            });
        }

        let now = Utc::now();
        let hold = EscrowHold {
            id: HoldId::from_string(processor_hold.hold_id),
            owner_account_id: owner.clone(),
            amount,
            status: HoldStatus::Authorized,
            client_secret: processor_hold.client_secret,
            artifact_ref: None,
            created_at: now,
            updated_at: now,
        };

        self.holds
            .write()
            .await
            .insert(hold.id.clone(), hold.clone());
        info!(hold_id = %hold.id, owner = %owner, %amount, "escrow hold authorized");
        Ok(hold)
    }

    /// Record the processor's confirmation that funds are reserved
    ///
    /// Driven by the processor's asynchronous event stream. Replays and late
    /// arrivals after a terminal transition are absorbed without effect.
    pub async fn mark_funds_held(&self, hold_id: &HoldId) -> Result<HoldStatus> {
        let mut holds = self.holds.write().await;
        let hold = holds.get_mut(hold_id).ok_or_else(|| PayMeshError::HoldNotFound {
            hold_id: hold_id.to_string(),
        })?;

        if hold.status == HoldStatus::Authorized {
            hold.status = HoldStatus::FundsHeld;
            hold.updated_at = Utc::now();
            info!(hold_id = %hold_id, "funds held");
        }
        Ok(hold.status)
    }

    /// The atomic delivery sequence: render, store, capture, mark delivered
    ///
    /// Strictly in that order. A render or upload failure cancels the hold
    /// without touching capture; a capture failure cancels the hold and
    /// surfaces the error. No step is retried here - re-submission by the
    /// caller is the recovery path.
    pub async fn finalize(&self, hold_id: &HoldId, payload: &str) -> Result<SignedUrl> {
        let owner = {
            let holds = self.holds.read().await;
            let hold = holds.get(hold_id).ok_or_else(|| PayMeshError::HoldNotFound {
                hold_id: hold_id.to_string(),
            })?;
            if hold.status.is_terminal() {
                return Err(PayMeshError::HoldStateConflict {
                    hold_id: hold_id.to_string(),
                    status: format!("{:?}", hold.status),
                    attempted: "finalize".to_string(),
                });
            }
            hold.owner_account_id.clone()
        };

        // (1) Produce the deliverable
        let bytes = match render_deliverable(hold_id, &owner, payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.cancel_after_failure(hold_id, &e).await;
                return Err(e);
            }
        };

        // (2) Store it and keep the reference on the hold before capture, so
        // a lost status write stays reconcilable
        let path = format!("deliverables/{owner}/{hold_id}.txt");
        let artifact_ref = match self.artifacts.upload(bytes, &path).await {
            Ok(url) => url,
            Err(e) => {
                self.cancel_after_failure(hold_id, &e).await;
                return Err(e);
            }
        };
        {
            let mut holds = self.holds.write().await;
            if let Some(hold) = holds.get_mut(hold_id) {
                hold.artifact_ref = Some(artifact_ref.clone());
                hold.updated_at = Utc::now();
            }
        }

        // (3) Capture - the irreversible commit point
        if let Err(e) = self.processor.capture(hold_id.as_str()).await {
            warn!(hold_id = %hold_id, error = %e,
                "capture failed after artifact upload; artifact is a reconcilable loss");
            self.cancel_after_failure(hold_id, &e).await;
            return Err(e);
        }

        // (4) Persist the terminal state
        {
            let mut holds = self.holds.write().await;
            if let Some(hold) = holds.get_mut(hold_id) {
                hold.status = HoldStatus::Delivered;
                hold.updated_at = Utc::now();
            }
        }
        info!(hold_id = %hold_id, "escrow hold delivered");
        Ok(artifact_ref)
    }

    /// Release a hold and record why
    ///
    /// Idempotent: a hold already in a terminal state is returned as-is, so
    /// a second cancel (or a cancel racing the reaper) never throws.
    pub async fn cancel(&self, hold_id: &HoldId, reason: CancelReason) -> Result<HoldStatus> {
        {
            let holds = self.holds.read().await;
            let hold = holds.get(hold_id).ok_or_else(|| PayMeshError::HoldNotFound {
                hold_id: hold_id.to_string(),
            })?;
            if hold.status.is_terminal() {
                return Ok(hold.status);
            }
        }

        self.processor.cancel(hold_id.as_str()).await?;

        let mut holds = self.holds.write().await;
        let hold = holds.get_mut(hold_id).ok_or_else(|| PayMeshError::HoldNotFound {
            hold_id: hold_id.to_string(),
        })?;
        if !hold.status.is_terminal() {
            hold.status = reason.terminal_status();
            hold.updated_at = Utc::now();
            info!(hold_id = %hold_id, status = ?hold.status, "escrow hold cancelled");
        }
        Ok(hold.status)
    }

    /// Repair holds whose capture succeeded but whose local status write was
    /// lost (e.g. a partition right after the capture call returned)
    ///
    /// Queries the processor for every open hold and marks the ones it
    /// reports captured as Delivered. Scheduled alongside the sweep.
    pub async fn reconcile(&self) -> ReconcileReport {
        let open: Vec<HoldId> = {
            let holds = self.holds.read().await;
            holds
                .values()
                .filter(|h| h.status.is_open())
                .map(|h| h.id.clone())
                .collect()
        };

        let mut recovered = 0;
        let mut errors = Vec::new();
        for hold_id in open {
            match self.processor.hold_state(hold_id.as_str()).await {
                Ok(ProcessorHoldState::Captured) => {
                    let mut holds = self.holds.write().await;
                    if let Some(hold) = holds.get_mut(&hold_id) {
                        if hold.status.is_open() {
                            hold.status = HoldStatus::Delivered;
                            hold.updated_at = Utc::now();
                            recovered += 1;
                            warn!(hold_id = %hold_id,
                                "reconciled captured-but-unmarked hold to Delivered");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("failed to query {hold_id}: {e}")),
            }
        }

        ReconcileReport { recovered, errors }
    }

    /// Get a hold by id
    pub async fn hold(&self, hold_id: &HoldId) -> Option<EscrowHold> {
        self.holds.read().await.get(hold_id).cloned()
    }

    /// Ids of open holds created before `now - ttl`
    pub async fn stale_holds(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<HoldId> {
        let holds = self.holds.read().await;
        holds
            .values()
            .filter(|h| h.is_stale(now, ttl))
            .map(|h| h.id.clone())
            .collect()
    }

    async fn cancel_after_failure(&self, hold_id: &HoldId, cause: &PayMeshError) {
        match self.cancel(hold_id, CancelReason::DeliveryFailure).await {
            Ok(status) => {
                info!(hold_id = %hold_id, status = ?status, cause = %cause,
                    "hold released after delivery failure");
            }
            Err(e) => {
                // The reaper will release it once the TTL lapses
                warn!(hold_id = %hold_id, error = %e, "rollback cancel failed");
            }
        }
    }
}

/// Produce the deliverable document for a hold
///
/// Content generation itself is out of scope; the payload arrives fully
/// formed and is wrapped into the stored document.
fn render_deliverable(hold_id: &HoldId, owner: &AccountId, payload: &str) -> Result<Vec<u8>> {
    if payload.trim().is_empty() {
        return Err(PayMeshError::DeliveryFailed {
            hold_id: hold_id.to_string(),
            message: "payload is empty".to_string(),
        });
    }
    let doc = format!(
        "deliverable: {hold_id}\naccount: {owner}\nissued: {}\n\n{payload}\n",
        Utc::now().to_rfc3339()
    );
    Ok(doc.into_bytes())
}
