//! Error types for PayMesh
//!
//! Every failure a caller can act on is explicit. Duplicate external events
//! are deliberately NOT an error - idempotent replay is reported through an
//! outcome flag, never through this enum.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for PayMesh operations
pub type Result<T> = std::result::Result<T, PayMeshError>;

/// PayMesh error types
#[derive(Debug, Clone, Error)]
pub enum PayMeshError {
    // ========================================================================
    // Ledger Errors
    // ========================================================================

    /// Account not found
    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    /// Account exists but was deactivated
    #[error("Account {account} is deactivated")]
    AccountInactive { account: String },

    /// Account already exists (signup path)
    #[error("Account already exists: {account}")]
    AccountExists { account: String },

    /// Balance too low for the requested debit
    #[error("Insufficient funds for {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: String,
        requested: Decimal,
        available: Decimal,
    },

    /// Zero or negative amount
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    // ========================================================================
    // Escrow Errors
    // ========================================================================

    /// Hold not found
    #[error("Hold not found: {hold_id}")]
    HoldNotFound { hold_id: String },

    /// Attempted write to a hold in a state that forbids it
    #[error("Hold {hold_id} is {status} and cannot accept {attempted}")]
    HoldStateConflict {
        hold_id: String,
        status: String,
        attempted: String,
    },

    /// Processor refused or ignored manual-capture mode; the flow fails
    /// closed instead of accepting an auto-capturing hold
    #[error("Processor did not confirm manual capture for hold {hold_id}")]
    ManualCaptureRequired { hold_id: String },

    /// External payment processor call failed
    #[error("Payment processor error: {message}")]
    ProcessorError { message: String },

    /// External artifact store call failed
    #[error("Artifact storage failure: {message}")]
    ArtifactStorageFailure { message: String },

    /// The deliverable could not be produced from the payload
    #[error("Delivery failed for hold {hold_id}: {message}")]
    DeliveryFailed { hold_id: String, message: String },

    /// External event is missing a field its type requires
    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    // ========================================================================
    // Capability Token Errors
    // ========================================================================

    /// Token past its expiry
    #[error("Capability token expired at {expired_at}")]
    TokenExpired { expired_at: i64 },

    /// Signature did not verify against the known key (or the token is
    /// malformed)
    #[error("Capability token signature is invalid")]
    TokenInvalidSignature,

    /// Token was minted for a different audience
    #[error("Capability token audience mismatch: expected {expected}, got {actual}")]
    TokenAudienceMismatch { expected: String, actual: String },

    /// Token does not grant the requested capability
    #[error("Capability token capability mismatch: expected {expected}, got {actual}")]
    TokenCapabilityMismatch { expected: String, actual: String },

    /// Requested TTL above the issuance ceiling
    #[error("Requested token TTL {requested_secs}s exceeds the {max_secs}s ceiling")]
    TokenTtlTooLong { requested_secs: u64, max_secs: u64 },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Caller failed authentication
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PayMeshError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create an invalid-amount error
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive { .. } => "ACCOUNT_INACTIVE",
            Self::AccountExists { .. } => "ACCOUNT_EXISTS",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::HoldNotFound { .. } => "HOLD_NOT_FOUND",
            Self::HoldStateConflict { .. } => "HOLD_STATE_CONFLICT",
            Self::ManualCaptureRequired { .. } => "MANUAL_CAPTURE_REQUIRED",
            Self::ProcessorError { .. } => "PROCESSOR_ERROR",
            Self::ArtifactStorageFailure { .. } => "ARTIFACT_STORAGE_FAILURE",
            Self::DeliveryFailed { .. } => "DELIVERY_FAILED",
            Self::InvalidEvent { .. } => "INVALID_EVENT",
            Self::TokenExpired { .. } => "TOKEN_EXPIRED",
            Self::TokenInvalidSignature => "TOKEN_INVALID_SIGNATURE",
            Self::TokenAudienceMismatch { .. } => "TOKEN_AUDIENCE_MISMATCH",
            Self::TokenCapabilityMismatch { .. } => "TOKEN_CAPABILITY_MISMATCH",
            Self::TokenTtlTooLong { .. } => "TOKEN_TTL_TOO_LONG",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
