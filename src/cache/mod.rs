//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! (method, full URL, body)
//!     → key.rs (length-prefixed SHA-256 digest)
//!     → store.rs (get: hit/miss with TTL check; set: on eligible 200s)
//! ```

pub mod key;
pub mod store;

pub use key::derive_key;
pub use store::{CacheStore, CachedEntry, DiskCache, MemoryCache};
