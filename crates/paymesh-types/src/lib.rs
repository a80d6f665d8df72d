//! PayMesh Types - Canonical domain types for the settlement engine
//!
//! This crate contains the foundational types for PayMesh with zero
//! dependencies on other paymesh crates:
//!
//! - Identity types (AccountId, HoldId, EntryId)
//! - Account and ledger-entry records
//! - Escrow hold records and the hold state machine
//! - The error taxonomy shared by every layer
//!
//! # Architectural Invariants
//!
//! 1. An account balance is always the signed sum of its ledger entries and
//!    is never observably negative.
//! 2. Each external event id is applied to at most one ledger entry.
//! 3. Hold status transitions are monotonic; terminal states are frozen.
//! 4. Ledger entries and holds are append-only audit records - never deleted.

pub mod identity;
pub mod ledger;
pub mod hold;
pub mod error;

pub use identity::*;
pub use ledger::*;
pub use hold::*;
pub use error::*;
