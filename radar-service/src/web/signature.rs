//! GitHub webhook signature verification.
//!
//! GitHub signs the raw request body with HMAC-SHA256 using the webhook
//! secret and sends `sha256=<hex digest>` in `X-Hub-Signature-256`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature.
///
/// `raw_body` must be the exact bytes received. Re-serializing a parsed
/// payload changes whitespace and key order and will not verify.
///
/// # Arguments
///
/// * `secret` - The webhook secret configured on GitHub
/// * `raw_body` - The request body as received
/// * `signature_header` - Value of `X-Hub-Signature-256`, if present
///
/// # Returns
///
/// `true` only if the header is well-formed and the digest matches.
pub fn verify_signature(secret: &[u8], raw_body: &[u8], signature_header: Option<&str>) -> bool {
    let header = match signature_header {
        Some(h) if !h.is_empty() => h,
        _ => {
            warn!("github_signature_missing");
            return false;
        }
    };

    let hex_digest = match header.strip_prefix(SIGNATURE_PREFIX) {
        Some(d) => d,
        None => {
            warn!("github_signature_unsupported_algorithm");
            return false;
        }
    };

    let provided = match hex::decode(hex_digest) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = hex_digest.len(), "github_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => {
            warn!("github_signature_invalid_key");
            return false;
        }
    };

    mac.update(raw_body);

    // Constant-time comparison; also rejects digests of the wrong length.
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(
            body_length = raw_body.len(),
            signature_length = provided.len(),
            "github_signature_mismatch"
        );
    }

    valid
}

/// Compute the `X-Hub-Signature-256` header value for `raw_body`.
#[cfg(test)]
pub(crate) fn sign(secret: &[u8], raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(raw_body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}
