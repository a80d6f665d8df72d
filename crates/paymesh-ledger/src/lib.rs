//! PayMesh Ledger - the credit ledger for agent settlement
//!
//! The ledger is:
//! - Account-keyed by AccountId
//! - Idempotent for external top-ups (each event id applies at most once)
//! - Immutable (entries are append-only)
//!
//! # Invariants
//!
//! 1. No negative balances as an observable post-state of any operation
//! 2. Every balance mutation appends exactly one entry in the same atomic
//!    unit of work
//! 3. Atomic operations only - the balance check, the mutation, the
//!    idempotency-set update, and the entry append commit together or not
//!    at all
//!
//! The whole ledger state sits behind a single write lock; one write-guard
//! section is the storage transaction. Nothing reads a balance, releases the
//! guard, and writes afterwards - that pattern races under concurrent
//! callers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use paymesh_types::{
    Account, AccountId, EntryId, EntryKind, EntryStatus, LedgerEntry, PayMeshError, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Outcome of a credit operation
///
/// `applied` is false when the external event id was already processed -
/// replays are expected under at-least-once delivery and are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditOutcome {
    pub applied: bool,
    pub new_balance: Decimal,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
}

impl LedgerState {
    fn account_mut(&mut self, account_id: &AccountId) -> Result<&mut Account> {
        self.accounts
            .get_mut(account_id)
            .ok_or_else(|| PayMeshError::AccountNotFound {
                account: account_id.to_string(),
            })
    }

    fn append_entry(
        &mut self,
        account_id: &AccountId,
        kind: EntryKind,
        amount: Decimal,
        external_event_id: Option<String>,
        description: String,
    ) -> EntryId {
        let entry = LedgerEntry {
            entry_id: EntryId::new(),
            account_id: account_id.clone(),
            kind,
            amount,
            external_event_id,
            description,
            status: EntryStatus::Completed,
            created_at: Utc::now(),
        };
        let entry_id = entry.entry_id.clone();
        self.entries.push(entry);
        entry_id
    }
}

/// The PayMesh credit ledger
///
/// Thread-safe and designed for concurrent access. Clones share state.
#[derive(Clone, Default)]
pub struct CreditLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl CreditLedger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Create an account explicitly (signup path)
    ///
    /// Top-ups create accounts implicitly; this is for callers that want an
    /// account before any money arrives.
    pub async fn create_account(
        &self,
        account_id: AccountId,
        external_ref: Option<String>,
    ) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account_id) {
            return Err(PayMeshError::AccountExists {
                account: account_id.to_string(),
            });
        }
        let account = Account::new(account_id.clone(), external_ref);
        state.accounts.insert(account_id, account.clone());
        Ok(account)
    }

    /// Deactivate an account
    ///
    /// Accounts are never deleted; a deactivated account rejects debits and
    /// top-ups but still accepts compensating refunds.
    pub async fn deactivate(&self, account_id: &AccountId) -> Result<()> {
        let mut state = self.state.write().await;
        let account = state.account_mut(account_id)?;
        account.active = false;
        account.updated_at = Utc::now();
        Ok(())
    }

    /// Resolve an account reference: exact id first, then the external
    /// fallback identifier
    pub async fn resolve(&self, account_ref: &str) -> Result<AccountId> {
        let state = self.state.read().await;
        let id = AccountId::from_string(account_ref);
        if state.accounts.contains_key(&id) {
            return Ok(id);
        }
        state
            .accounts
            .values()
            .find(|a| a.external_ref.as_deref() == Some(account_ref))
            .map(|a| a.id.clone())
            .ok_or_else(|| PayMeshError::AccountNotFound {
                account: account_ref.to_string(),
            })
    }

    /// Get the balance of an account
    pub async fn balance(&self, account_id: &AccountId) -> Result<Decimal> {
        let state = self.state.read().await;
        state
            .accounts
            .get(account_id)
            .map(|a| a.balance)
            .ok_or_else(|| PayMeshError::AccountNotFound {
                account: account_id.to_string(),
            })
    }

    /// Credit an account (increase balance)
    ///
    /// When `external_event_id` is present and was already applied to this
    /// account, the call is a no-op returning `applied = false`. Otherwise
    /// the balance increment, the event-id record, and the `purchase` entry
    /// commit in the same write-guard section. Creates the account on first
    /// top-up.
    pub async fn credit(
        &self,
        account_id: &AccountId,
        amount: Decimal,
        external_event_id: Option<String>,
        description: impl Into<String>,
    ) -> Result<CreditOutcome> {
        ensure_positive(amount)?;

        let mut state = self.state.write().await;
        let account = state
            .accounts
            .entry(account_id.clone())
            .or_insert_with(|| Account::new(account_id.clone(), None));

        if !account.active {
            return Err(PayMeshError::AccountInactive {
                account: account_id.to_string(),
            });
        }

        if let Some(ref event_id) = external_event_id {
            if account.processed_events.contains(event_id) {
                return Ok(CreditOutcome {
                    applied: false,
                    new_balance: account.balance,
                });
            }
            account.processed_events.insert(event_id.clone());
        }

        account.balance += amount;
        account.updated_at = Utc::now();
        let new_balance = account.balance;

        state.append_entry(
            account_id,
            EntryKind::Purchase,
            amount,
            external_event_id,
            description.into(),
        );

        Ok(CreditOutcome {
            applied: true,
            new_balance,
        })
    }

    /// Debit an account (decrease balance)
    ///
    /// The balance condition and the decrement are applied under one write
    /// guard - a conditional update, not a read-then-write. Fails with
    /// `InsufficientFunds` when `balance < amount` at that moment.
    pub async fn debit(
        &self,
        account_id: &AccountId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Decimal> {
        ensure_positive(amount)?;

        let mut state = self.state.write().await;
        let account = state.account_mut(account_id)?;

        if !account.active {
            return Err(PayMeshError::AccountInactive {
                account: account_id.to_string(),
            });
        }
        if account.balance < amount {
            return Err(PayMeshError::InsufficientFunds {
                account: account_id.to_string(),
                requested: amount,
                available: account.balance,
            });
        }

        account.balance -= amount;
        account.updated_at = Utc::now();
        let new_balance = account.balance;

        state.append_entry(account_id, EntryKind::Deduction, amount, None, description.into());

        Ok(new_balance)
    }

    /// Refund an account (unconditional credit)
    ///
    /// Compensates a debit whose downstream work failed. Works even on a
    /// deactivated account - compensation must never be refusable.
    pub async fn refund(
        &self,
        account_id: &AccountId,
        amount: Decimal,
        reason: impl Into<String>,
    ) -> Result<Decimal> {
        ensure_positive(amount)?;

        let mut state = self.state.write().await;
        let account = state.account_mut(account_id)?;

        account.balance += amount;
        account.updated_at = Utc::now();
        let new_balance = account.balance;

        state.append_entry(account_id, EntryKind::Refund, amount, None, reason.into());

        Ok(new_balance)
    }

    /// Get all entries for an account
    pub async fn entries_for(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| &e.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Get the total number of entries
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Get account state
    pub async fn account(&self, account_id: &AccountId) -> Option<Account> {
        self.state.read().await.accounts.get(account_id).cloned()
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PayMeshError::invalid_amount(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paymesh_types::EntryKind;
    use rust_decimal_macros::dec;

    fn acct(s: &str) -> AccountId {
        AccountId::from_string(s)
    }

    #[tokio::test]
    async fn test_credit_and_balance() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");

        let outcome = ledger
            .credit(&account, dec!(25.00), None, "starter pack")
            .await
            .unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.new_balance, dec!(25.00));
        assert_eq!(ledger.balance(&account).await.unwrap(), dec!(25.00));
    }

    #[tokio::test]
    async fn test_debit_decrements_and_logs() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .credit(&account, dec!(10.00), None, "top-up")
            .await
            .unwrap();

        let balance = ledger.debit(&account, dec!(1.00), "handshake fee").await.unwrap();
        assert_eq!(balance, dec!(9.00));

        let deductions: Vec<_> = ledger
            .entries_for(&account)
            .await
            .into_iter()
            .filter(|e| e.kind == EntryKind::Deduction)
            .collect();
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].amount, dec!(1.00));
    }

    #[tokio::test]
    async fn test_no_negative_balance() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .credit(&account, dec!(0.50), None, "top-up")
            .await
            .unwrap();

        let result = ledger.debit(&account, dec!(0.99), "analysis").await;
        assert!(matches!(
            result,
            Err(PayMeshError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(&account).await.unwrap(), dec!(0.50));
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overspend() {
        // Balance 10.00, ten concurrent debits of 3.00: exactly three may
        // succeed and the final balance is 1.00.
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .credit(&account, dec!(10.00), None, "top-up")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            let account = account.clone();
            handles.push(tokio::spawn(async move {
                ledger.debit(&account, dec!(3.00), "burst").await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(ledger.balance(&account).await.unwrap(), dec!(1.00));
    }

    #[tokio::test]
    async fn test_idempotent_credit() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");

        let first = ledger
            .credit(&account, dec!(20.00), Some("evt_1".to_string()), "top-up")
            .await
            .unwrap();
        assert!(first.applied);

        let replay = ledger
            .credit(&account, dec!(20.00), Some("evt_1".to_string()), "top-up")
            .await
            .unwrap();
        assert!(!replay.applied);
        assert_eq!(replay.new_balance, dec!(20.00));
        assert_eq!(ledger.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_refund_compensates_debit() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .credit(&account, dec!(5.00), None, "top-up")
            .await
            .unwrap();
        ledger.debit(&account, dec!(2.00), "analysis").await.unwrap();

        let balance = ledger
            .refund(&account, dec!(2.00), "analysis pipeline failed")
            .await
            .unwrap();
        assert_eq!(balance, dec!(5.00));

        let entries = ledger.entries_for(&account).await;
        let signed: Decimal = entries.iter().map(|e| e.signed_amount()).sum();
        assert_eq!(signed, balance);
    }

    #[tokio::test]
    async fn test_credit_creates_account_on_first_topup() {
        let ledger = CreditLedger::new();
        let account = acct("acct_new");
        assert!(ledger.balance(&account).await.is_err());

        ledger
            .credit(&account, dec!(19.00), Some("evt_9".to_string()), "starter plan")
            .await
            .unwrap();
        assert_eq!(ledger.balance(&account).await.unwrap(), dec!(19.00));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_external_ref() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .create_account(account.clone(), Some("cus_4242".to_string()))
            .await
            .unwrap();

        assert_eq!(ledger.resolve("acct_alice").await.unwrap(), account);
        assert_eq!(ledger.resolve("cus_4242").await.unwrap(), account);
        assert!(ledger.resolve("cus_unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_deactivated_account_rejects_spend_but_accepts_refund() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger
            .credit(&account, dec!(10.00), None, "top-up")
            .await
            .unwrap();
        ledger.deactivate(&account).await.unwrap();

        assert!(matches!(
            ledger.debit(&account, dec!(1.00), "fee").await,
            Err(PayMeshError::AccountInactive { .. })
        ));
        assert!(matches!(
            ledger.credit(&account, dec!(1.00), None, "top-up").await,
            Err(PayMeshError::AccountInactive { .. })
        ));
        assert!(ledger.refund(&account, dec!(1.00), "compensation").await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        let result = ledger.credit(&account, dec!(0), None, "nothing").await;
        assert!(matches!(result, Err(PayMeshError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn test_create_account_twice_fails() {
        let ledger = CreditLedger::new();
        let account = acct("acct_alice");
        ledger.create_account(account.clone(), None).await.unwrap();
        assert!(matches!(
            ledger.create_account(account, None).await,
            Err(PayMeshError::AccountExists { .. })
        ));
    }
}
