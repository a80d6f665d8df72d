//! Capability token service
//!
//! Tokens are HS256-signed with a single shared key held by the issuing
//! registry; verifying parties hold the same key out of band. Expiry is
//! checked with zero leeway - a token one second past `exp` is dead.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use paymesh_types::{PayMeshError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on the TTL a caller may request at issuance. Callers use
/// 5-60 minutes in practice.
pub const MAX_TOKEN_TTL_SECS: u64 = 3600;

/// Claims carried by a capability token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityClaims {
    /// Issuer - always the registry
    pub iss: String,
    /// Caller identity the token was minted for
    pub sub: String,
    /// Target identity that may accept this token
    pub aud: String,
    /// The single operation this token authorizes
    pub capability: String,
    pub iat: i64,
    pub exp: i64,
    /// Nonce; unique per token
    pub jti: String,
}

/// Issues and verifies capability tokens
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a token service over a shared signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            issuer: "registry".to_string(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed capability token
    ///
    /// `ttl` must not exceed [`MAX_TOKEN_TTL_SECS`].
    pub fn issue(
        &self,
        subject: &str,
        audience: &str,
        capability: &str,
        ttl: std::time::Duration,
    ) -> Result<String> {
        self.issue_at(Utc::now(), subject, audience, capability, ttl)
    }

    /// Verify a token against the expected audience and, when required, the
    /// expected capability
    pub fn verify(
        &self,
        token: &str,
        expected_audience: &str,
        expected_capability: Option<&str>,
    ) -> Result<CapabilityClaims> {
        self.verify_at(Utc::now(), token, expected_audience, expected_capability)
    }

    fn issue_at(
        &self,
        now: DateTime<Utc>,
        subject: &str,
        audience: &str,
        capability: &str,
        ttl: std::time::Duration,
    ) -> Result<String> {
        if ttl.as_secs() > MAX_TOKEN_TTL_SECS {
            return Err(PayMeshError::TokenTtlTooLong {
                requested_secs: ttl.as_secs(),
                max_secs: MAX_TOKEN_TTL_SECS,
            });
        }
        let ttl = Duration::from_std(ttl)
            .map_err(|e| PayMeshError::internal(format!("ttl out of range: {e}")))?;

        let claims = CapabilityClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: audience.to_string(),
            capability: capability.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| PayMeshError::internal(format!("failed to encode token: {e}")))
    }

    fn verify_at(
        &self,
        now: DateTime<Utc>,
        token: &str,
        expected_audience: &str,
        expected_capability: Option<&str>,
    ) -> Result<CapabilityClaims> {
        // Signature first. Expiry and audience are checked by hand below so
        // they fail with precise errors and zero clock leeway.
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<CapabilityClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| PayMeshError::TokenInvalidSignature)?
            .claims;

        if now.timestamp() > claims.exp {
            return Err(PayMeshError::TokenExpired {
                expired_at: claims.exp,
            });
        }
        if claims.aud != expected_audience {
            return Err(PayMeshError::TokenAudienceMismatch {
                expected: expected_audience.to_string(),
                actual: claims.aud,
            });
        }
        if let Some(expected) = expected_capability {
            if claims.capability != expected {
                return Err(PayMeshError::TokenCapabilityMismatch {
                    expected: expected.to_string(),
                    actual: claims.capability,
                });
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-for-capability-tokens!")
    }

    #[test]
    fn test_issue_and_verify() {
        let svc = service();
        let token = svc
            .issue("did:mesh:payer", "did:mesh:worker", "gov.rfp.bidder", StdDuration::from_secs(300))
            .unwrap();

        let claims = svc
            .verify(&token, "did:mesh:worker", Some("gov.rfp.bidder"))
            .unwrap();
        assert_eq!(claims.iss, "registry");
        assert_eq!(claims.sub, "did:mesh:payer");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_expiry_boundary() {
        let svc = service();
        let t0 = Utc::now();
        let token = svc
            .issue_at(t0, "did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();

        // Alive one second before expiry
        let at_299 = t0 + Duration::seconds(299);
        assert!(svc.verify_at(at_299, &token, "did:mesh:b", None).is_ok());

        // Dead one second after
        let at_301 = t0 + Duration::seconds(301);
        assert!(matches!(
            svc.verify_at(at_301, &token, "did:mesh:b", None),
            Err(PayMeshError::TokenExpired { .. })
        ));
    }

    #[test]
    fn test_audience_mismatch_checked_before_expiry() {
        let svc = service();
        let token = svc
            .issue("did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();

        let result = svc.verify(&token, "did:mesh:eavesdropper", None);
        assert!(matches!(
            result,
            Err(PayMeshError::TokenAudienceMismatch { .. })
        ));
    }

    #[test]
    fn test_capability_mismatch() {
        let svc = service();
        let token = svc
            .issue("did:mesh:a", "did:mesh:b", "dev.code.review", StdDuration::from_secs(300))
            .unwrap();

        assert!(matches!(
            svc.verify(&token, "did:mesh:b", Some("fin.defi.trade")),
            Err(PayMeshError::TokenCapabilityMismatch { .. })
        ));
        // No capability requirement: any capability passes
        assert!(svc.verify(&token, "did:mesh:b", None).is_ok());
    }

    #[test]
    fn test_wrong_key_fails_signature() {
        let svc = service();
        let other = TokenService::new("a-completely-different-secret-key!!");
        let token = svc
            .issue("did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();

        assert!(matches!(
            other.verify(&token, "did:mesh:b", None),
            Err(PayMeshError::TokenInvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_token_fails_signature() {
        let svc = service();
        let token = svc
            .issue("did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();
        let tampered = format!("{}x", token);

        assert!(matches!(
            svc.verify(&tampered, "did:mesh:b", None),
            Err(PayMeshError::TokenInvalidSignature)
        ));
    }

    #[test]
    fn test_ttl_ceiling_enforced() {
        let svc = service();
        let result = svc.issue(
            "did:mesh:a",
            "did:mesh:b",
            "cap",
            StdDuration::from_secs(MAX_TOKEN_TTL_SECS + 1),
        );
        assert!(matches!(
            result,
            Err(PayMeshError::TokenTtlTooLong { .. })
        ));
    }

    #[test]
    fn test_nonce_is_unique_per_token() {
        let svc = service();
        let a = svc
            .issue("did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();
        let b = svc
            .issue("did:mesh:a", "did:mesh:b", "cap", StdDuration::from_secs(300))
            .unwrap();
        let ca = svc.verify(&a, "did:mesh:b", None).unwrap();
        let cb = svc.verify(&b, "did:mesh:b", None).unwrap();
        assert_ne!(ca.jti, cb.jti);
    }
}
