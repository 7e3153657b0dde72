//! Keyed hashing for the identity signatures the fast path, coordinator,
//! and reputation cache all key their state by. One salt, one hash
//! function, shared so two crates never drift into disagreeing on what
//! a "signature" is.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A 16-hex-char truncated HMAC-SHA256 digest. Opaque on purpose: callers
/// compare and store it, never decode it.
pub type Signature = String;

/// Wraps the operator-provided secret used to key every HMAC in the
/// engine. Never logged, never serialized.
#[derive(Clone)]
pub struct IdentitySalt(Vec<u8>);

impl IdentitySalt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    /// HMAC-SHA256 over `parts` joined with `\0`, truncated to 16 hex
    /// chars (8 bytes) — enough to dedupe collisions at engine scale
    /// without keeping full digests around for every signature record.
    pub fn hash(&self, parts: &[&str]) -> Signature {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                mac.update(b"\0");
            }
            mac.update(part.as_bytes());
        }
        let digest = mac.finalize().into_bytes();
        hex::encode(&digest[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let salt = IdentitySalt::new("test-secret");
        let a = salt.hash(&["1.2.3.4", "curl/8.0"]);
        let b = salt.hash(&["1.2.3.4", "curl/8.0"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let a = IdentitySalt::new("salt-a").hash(&["1.2.3.4", "curl/8.0"]);
        let b = IdentitySalt::new("salt-b").hash(&["1.2.3.4", "curl/8.0"]);
        assert_ne!(a, b);
    }

    #[test]
    fn part_ordering_matters() {
        let salt = IdentitySalt::new("test-secret");
        let a = salt.hash(&["ip", "ua"]);
        let b = salt.hash(&["ua", "ip"]);
        assert_ne!(a, b);
    }
}
