//! Webhook signature verification (§4.6 `webhook` job type): when
//! `check_config.secret` is set, an inbound `POST /webhook/{job_id}` must
//! carry `X-Webhook-Signature: sha256=<hex HMAC-SHA256 of the raw body>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Returns `true` when no secret is configured (the job accepts any caller)
/// or when the header's digest matches the computed one.
#[must_use]
pub fn verify_signature(secret: Option<&str>, raw_body: &[u8], header_value: Option<&str>) -> bool {
    let Some(secret) = secret else { return true };

    let Some(header_value) = header_value else { return false };
    let Some(hex_digest) = header_value.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&expected_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("any key length is valid");
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn no_secret_configured_accepts_any_caller() {
        assert!(verify_signature(None, b"payload", None));
    }

    #[test]
    fn valid_signature_is_accepted() {
        let signature = sign("top-secret", b"{\"ok\":true}");
        assert!(verify_signature(Some("top-secret"), b"{\"ok\":true}", Some(&signature)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signature = sign("top-secret", b"{\"ok\":true}");
        assert!(!verify_signature(Some("other-secret"), b"{\"ok\":true}", Some(&signature)));
    }

    #[test]
    fn missing_header_is_rejected_when_secret_configured() {
        assert!(!verify_signature(Some("top-secret"), b"payload", None));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signature = sign("top-secret", b"original");
        assert!(!verify_signature(Some("top-secret"), b"tampered", Some(&signature)));
    }
}
