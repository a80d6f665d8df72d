//! PayMesh Escrow - outcome-based payment with compensating rollback
//!
//! Funds are reserved with a manual-capture hold at the external processor
//! and captured only after the deliverable is durably stored. Any failure on
//! the way releases the hold. A periodic reaper releases holds nobody
//! finalized (the dead man's switch), and a reconciliation pass repairs
//! holds whose capture succeeded but whose local status write was lost.

pub mod artifact;
pub mod flow;
pub mod processor;
pub mod reaper;
pub mod webhook;

pub use artifact::*;
pub use flow::*;
pub use processor::*;
pub use reaper::*;
pub use webhook::*;
