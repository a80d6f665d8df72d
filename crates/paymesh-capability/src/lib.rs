//! PayMesh Capability - short-lived signed capability tokens
//!
//! A capability token authorizes one identity to invoke a specific operation
//! on another. Tokens are ephemeral: constructed on demand, verified on
//! receipt, discarded after use. There is no revocation list - compromise
//! before expiry is accepted risk, mitigated by short TTLs.

pub mod discovery;
pub mod token;

pub use discovery::*;
pub use token::*;
