//! Account and ledger-entry records
//!
//! Entries are one-sided audit records: every balance mutation appends
//! exactly one entry in the same atomic unit of work that moved the balance.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, EntryId};

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// External top-up credited to the account
    Purchase,
    /// Spend debited from the account
    Deduction,
    /// Compensating credit for a deduction whose downstream work failed
    Refund,
}

impl EntryKind {
    /// Sign of this entry when summing toward a balance
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Purchase | Self::Refund => Decimal::ONE,
            Self::Deduction => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Status of a ledger entry
///
/// Entries post terminally: they are written once, in the same atomic unit
/// as the balance mutation, and never updated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Completed,
}

/// A single immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub account_id: AccountId,
    pub kind: EntryKind,
    /// Always positive; direction comes from `kind`
    pub amount: Decimal,
    /// External event id for idempotent top-up ingestion
    pub external_event_id: Option<String>,
    pub description: String,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The signed contribution of this entry to the account balance
    pub fn signed_amount(&self) -> Decimal {
        self.kind.sign() * self.amount
    }
}

/// A credit account
///
/// Created on signup or on first top-up; mutated only through ledger
/// operations; never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Fallback identifier for webhook lookup (e.g. the processor's
    /// customer reference) when the event does not carry our account id
    pub external_ref: Option<String>,
    pub balance: Decimal,
    /// External event ids already applied to this account
    pub processed_events: HashSet<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, external_ref: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            external_ref,
            balance: Decimal::ZERO,
            processed_events: HashSet::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
