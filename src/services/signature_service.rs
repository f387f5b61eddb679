//! Shared-secret request signatures.
//!
//! Senders sign `X-Timestamp || raw body` with HMAC-SHA256 and send the hex
//! digest in `X-Signature`. The server recomputes the digest over the bytes it
//! actually received and compares in constant time.

use std::{fmt, sync::Arc};

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Length of a hex-encoded SHA-256 digest.
const SIGNATURE_HEX_LEN: usize = 64;

/// Verifies request signatures against the configured shared secret.
///
/// Cheap to clone; the key is shared.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<[u8]>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC key length is valid");
        mac.update(timestamp.as_bytes());
        mac.update(body);
        mac
    }

    /// Hex-encoded HMAC-SHA256 of `timestamp || body`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        hex::encode(self.mac(timestamp, body).finalize().into_bytes())
    }

    /// Check `signature` against `timestamp || body`.
    ///
    /// Only the exact form `sign` produces is accepted: 64 lowercase hex
    /// characters with no surrounding whitespace. Anything else, including a
    /// missing signature, returns `false`.
    pub fn verify(&self, timestamp: &str, signature: Option<&str>, body: &[u8]) -> bool {
        let Some(signature) = signature else {
            return false;
        };

        if signature.len() != SIGNATURE_HEX_LEN || !signature.bytes().all(is_lower_hex) {
            return false;
        }

        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        // verify_slice compares in constant time
        self.mac(timestamp, body).verify_slice(&provided).is_ok()
    }
}

fn is_lower_hex(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'a'..=b'f')
}

/// Whether a unix-seconds `timestamp` lies within `tolerance_secs` of `now`.
///
/// Unparseable timestamps are never fresh.
pub fn timestamp_is_fresh(timestamp: &str, now: i64, tolerance_secs: u64) -> bool {
    match timestamp.trim().parse::<i64>() {
        Ok(sent) => sent.abs_diff(now) <= tolerance_secs,
        Err(_) => false,
    }
}
