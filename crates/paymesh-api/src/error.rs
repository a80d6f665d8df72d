//! API error handling
//!
//! Maps the core error taxonomy onto HTTP statuses. User-visible failures
//! carry the error code and message so the caller can decide the next
//! action (top up, retry, re-handshake) without seeing internal state.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paymesh_types::PayMeshError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error
#[derive(Debug, Error)]
pub enum ApiError {
    /// A core operation failed
    #[error(transparent)]
    Domain(#[from] PayMeshError),

    /// Webhook body signature did not verify
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// Webhook body could not be parsed
    #[error("Invalid webhook payload")]
    InvalidWebhookPayload,

    /// Missing or wrong scheduler secret
    #[error("Unauthorized")]
    CronUnauthorized,
}

/// JSON body returned for every error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub msg: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(e) => match e {
                PayMeshError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                PayMeshError::AccountNotFound { .. } | PayMeshError::AccountInactive { .. } => {
                    StatusCode::FORBIDDEN
                }
                PayMeshError::AccountExists { .. }
                | PayMeshError::InvalidAmount { .. }
                | PayMeshError::InvalidEvent { .. }
                | PayMeshError::TokenTtlTooLong { .. } => StatusCode::BAD_REQUEST,
                PayMeshError::HoldNotFound { .. } => StatusCode::NOT_FOUND,
                PayMeshError::HoldStateConflict { .. } => StatusCode::CONFLICT,
                PayMeshError::TokenExpired { .. }
                | PayMeshError::TokenInvalidSignature
                | PayMeshError::TokenAudienceMismatch { .. }
                | PayMeshError::TokenCapabilityMismatch { .. }
                | PayMeshError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
                PayMeshError::ManualCaptureRequired { .. }
                | PayMeshError::ProcessorError { .. }
                | PayMeshError::ArtifactStorageFailure { .. }
                | PayMeshError::DeliveryFailed { .. }
                | PayMeshError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidWebhookSignature | Self::InvalidWebhookPayload => StatusCode::BAD_REQUEST,
            Self::CronUnauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.error_code(),
            Self::InvalidWebhookSignature => "INVALID_WEBHOOK_SIGNATURE",
            Self::InvalidWebhookPayload => "INVALID_WEBHOOK_PAYLOAD",
            Self::CronUnauthorized => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes() {
        let insufficient = ApiError::Domain(PayMeshError::InsufficientFunds {
            account: "acct_a".to_string(),
            requested: dec!(1.00),
            available: dec!(0.10),
        });
        assert_eq!(insufficient.status_code(), StatusCode::PAYMENT_REQUIRED);

        let unknown = ApiError::Domain(PayMeshError::AccountNotFound {
            account: "acct_a".to_string(),
        });
        assert_eq!(unknown.status_code(), StatusCode::FORBIDDEN);

        assert_eq!(
            ApiError::CronUnauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
