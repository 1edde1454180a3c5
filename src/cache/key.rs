//! Cache key derivation.
//!
//! A key is a SHA-256 digest over the request's method, full URL (including
//! the query string) and raw body bytes. Each segment is length-prefixed
//! before hashing so that no two distinct (method, URL, body) triples can
//! produce the same byte stream; plain concatenation would let ("G", "ET/x")
//! collide with ("GET", "/x").
//!
//! There is no process-specific salt: the same triple hashes to the same key
//! across restarts, which keeps a persistent store valid between runs.

use axum::http::Method;
use sha2::{Digest, Sha256};

/// Derive the cache key for a request.
pub fn derive_key(method: &Method, url: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for segment in [method.as_str().as_bytes(), url.as_bytes(), body] {
        hasher.update((segment.len() as u64).to_be_bytes());
        hasher.update(segment);
    }
    format!("{:x}", hasher.finalize())
}
