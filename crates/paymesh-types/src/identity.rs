//! Identity types for PayMesh
//!
//! Strongly typed wrappers around id strings to prevent accidental mixing of
//! different ID types. Ids are strings rather than UUIDs because some of them
//! originate outside the system (a hold id is whatever the payment processor
//! minted for the intent).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate string-backed ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new random, prefixed ID
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::new_v4()))
            }

            /// Wrap an existing id string
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id_type!(AccountId, "acct", "Unique identifier for a credit account");
define_id_type!(EntryId, "entry", "Unique identifier for a ledger entry");
define_id_type!(
    HoldId,
    "hold",
    "Identifier for an escrow hold - equals the processor's payment-intent id \
     when the hold was opened through an external processor"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert!(a.as_str().starts_with("acct_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_external_id_round_trip() {
        let hold = HoldId::from_string("pi_3OqX2eF9aBcDeFgH");
        assert_eq!(hold.as_str(), "pi_3OqX2eF9aBcDeFgH");
        assert_eq!(hold.to_string(), "pi_3OqX2eF9aBcDeFgH");
    }
}
