//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key identifying a request.
///
/// The identity is the HTTP method (case-insensitive) plus the absolute
/// URL. Two requests with the same key are considered the same resource
/// for lookup and storage purposes.
pub fn cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
