//! Escrow hold records and the hold state machine
//!
//! A hold reserves funds at the external processor without capturing them.
//! Capture is the irreversible commit point and only ever happens after the
//! deliverable is durably stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, HoldId};

/// State of an escrow hold
///
/// ```text
/// Authorized ──► FundsHeld ──► Delivered
///     │              │
///     ├──────────────┴──► CancelledTimeout   (reaper)
///     └──────────────────► CancelledError    (delivery failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    /// Processor accepted the manual-capture hold
    Authorized,
    /// Processor confirmed the funds are reserved
    FundsHeld,
    /// Artifact stored and funds captured
    Delivered,
    /// Released by the stale-hold reaper
    CancelledTimeout,
    /// Released after a delivery or capture failure
    CancelledError,
}

impl HoldStatus {
    /// Check if this is a terminal state - no further writes occur
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::CancelledTimeout | Self::CancelledError
        )
    }

    /// Check if funds are still reserved at the processor
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Authorized | Self::FundsHeld)
    }
}

/// Why a hold was cancelled; selects the terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Hold exceeded its TTL without a delivery
    Timeout,
    /// Delivery pipeline or capture failed
    DeliveryFailure,
}

impl CancelReason {
    pub fn terminal_status(&self) -> HoldStatus {
        match self {
            Self::Timeout => HoldStatus::CancelledTimeout,
            Self::DeliveryFailure => HoldStatus::CancelledError,
        }
    }
}

/// A time-limited reference to a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// An escrow hold
///
/// The id equals the processor's payment-intent id. Holds are kept for audit
/// after reaching a terminal state; they are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowHold {
    pub id: HoldId,
    pub owner_account_id: AccountId,
    pub amount: Decimal,
    pub status: HoldStatus,
    /// Secret the payer's client needs to confirm the hold with the processor
    pub client_secret: String,
    /// Set before capture so a lost status write stays reconcilable
    pub artifact_ref: Option<SignedUrl>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscrowHold {
    /// Whether the reaper should release this hold at `now` given `ttl`
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        match now.checked_sub_signed(ttl) {
            Some(cutoff) => self.status.is_open() && self.created_at < cutoff,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!HoldStatus::Authorized.is_terminal());
        assert!(!HoldStatus::FundsHeld.is_terminal());
        assert!(HoldStatus::Delivered.is_terminal());
        assert!(HoldStatus::CancelledTimeout.is_terminal());
        assert!(HoldStatus::CancelledError.is_terminal());
    }

    #[test]
    fn test_open_states() {
        assert!(HoldStatus::Authorized.is_open());
        assert!(HoldStatus::FundsHeld.is_open());
        assert!(!HoldStatus::Delivered.is_open());
    }

    #[test]
    fn test_cancel_reason_maps_to_terminal_status() {
        assert_eq!(
            CancelReason::Timeout.terminal_status(),
            HoldStatus::CancelledTimeout
        );
        assert_eq!(
            CancelReason::DeliveryFailure.terminal_status(),
            HoldStatus::CancelledError
        );
    }

    #[test]
    fn test_wire_format_matches_processor_convention() {
        let json = serde_json::to_string(&HoldStatus::CancelledTimeout).unwrap();
        assert_eq!(json, "\"CANCELLED_TIMEOUT\"");
    }
}
