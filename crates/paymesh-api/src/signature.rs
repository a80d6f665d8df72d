//! Webhook signature verification
//!
//! The processor signs the raw request body with HMAC-SHA256 over the shared
//! webhook secret and sends the hex digest in `X-Webhook-Signature`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Check a hex HMAC-SHA256 signature against the raw body
///
/// Comparison happens inside the MAC (constant time); any decode or key
/// failure is simply an invalid signature.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Produce the hex signature for a body (used by tests and local tooling)
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let body = br#"{"event_id":"evt_1"}"#;
        let sig = sign_webhook_body("whsec_test", body);
        assert!(verify_webhook_signature("whsec_test", body, &sig));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"payload";
        let sig = sign_webhook_body("whsec_a", body);
        assert!(!verify_webhook_signature("whsec_b", body, &sig));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let sig = sign_webhook_body("whsec_test", b"payload");
        assert!(!verify_webhook_signature("whsec_test", b"payload2", &sig));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        assert!(!verify_webhook_signature("whsec_test", b"payload", "not-hex"));
    }
}
