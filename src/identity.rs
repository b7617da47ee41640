//! Salted hashing for subject and ticket keys, plus ticket minting.
//!
//! Raw subject identifiers and raw bearer tickets never reach a storage
//! backend; only the digests computed here do.

use sha2::{Digest, Sha256, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hex-encoded SHA-512 of `value` with the deployment salt appended.
/// Same value + same salt is stable across restarts, so it works as a
/// storage key; without the salt the digest is not linkable to the value.
pub fn salted_hash(value: &str, salt: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(value.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a fresh single-use ticket for a verified consent request token.
/// Hashing in a nanosecond timestamp keeps two submissions of the same
/// token from colliding.
pub fn mint_ticket(signed_token: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(signed_token.as_bytes());
    hasher.update(nanos.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
