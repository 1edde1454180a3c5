//! Response cache stores with per-entry expiry.
//!
//! # Responsibilities
//! - Hold cached upstream responses keyed by digest
//! - Treat an entry as absent once its TTL has elapsed, even before eviction
//! - Never surface store faults: an unreadable entry is a miss, a failed
//!   write is a dropped write
//!
//! # Design Decisions
//! - `CacheStore` is a trait so the orchestrator takes the store as an
//!   injected handle; implementations can be swapped without touching it
//! - Eviction is lazy: expired entries are dropped on the read that finds them
//! - Same-key write races resolve last-write-wins; different keys never
//!   interfere (sharded map / one file per key)

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A cached upstream response.
///
/// Headers are stored post-filtering, so a hit can be turned into a response
/// without another pass through the outbound filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Upstream status code (always 200 for entries written by the gateway).
    pub status: u16,
    /// Response headers, in upstream order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Key-value store for cached responses.
pub trait CacheStore: Send + Sync {
    /// Fetch an entry. Returns `None` for unknown, expired, or unreadable keys.
    fn get(&self, key: &str) -> Option<CachedEntry>;

    /// Insert an entry, replacing any previous one under the same key.
    fn set(&self, key: &str, entry: CachedEntry, ttl: Duration);
}

/// In-memory store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, StoredEntry>,
}

struct StoredEntry {
    entry: CachedEntry,
    expires_at: Instant,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of entries currently held, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedEntry> {
        if let Some(stored) = self.entries.get(key) {
            if Instant::now() < stored.expires_at {
                return Some(stored.entry.clone());
            }
            // Expired: drop the read guard before removing.
            drop(stored);
            self.entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, entry: CachedEntry, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                entry,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Filesystem-backed store: one JSON file per key. Entries survive restarts.
///
/// Keys are hex digests, so they are used as file names directly. Expiry is
/// recorded in whole seconds since the Unix epoch; wall-clock time (rather
/// than a monotonic clock) is what keeps entries comparable across restarts.
pub struct DiskCache {
    root: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct DiskRecord {
    /// Seconds since the Unix epoch at which this entry expires.
    expires_at: u64,
    entry: CachedEntry,
}

impl DiskCache {
    /// Open (creating if needed) a disk cache rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> Option<CachedEntry> {
        let path = self.entry_path(key);
        let file = File::open(&path).ok()?;

        let record: DiskRecord = match serde_json::from_reader(BufReader::new(file)) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry, treating as miss");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if unix_now() >= record.expires_at {
            let _ = fs::remove_file(&path);
            return None;
        }
        Some(record.entry)
    }

    fn set(&self, key: &str, entry: CachedEntry, ttl: Duration) {
        let record = DiskRecord {
            expires_at: unix_now() + ttl.as_secs(),
            entry,
        };
        let path = self.entry_path(key);
        // Write to a temp file and rename so readers never see a partial entry.
        let tmp = self.root.join(format!("{key}.json.tmp"));

        let result = (|| -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &record).map_err(std::io::Error::other)?;
            writer.flush()?;
            fs::rename(&tmp, &path)
        })();

        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Cache write failed, dropping entry");
            let _ = fs::remove_file(&tmp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry(body: &str) -> CachedEntry {
        CachedEntry {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());

        cache.set("k", entry("{\"n\":1}"), Duration::from_secs(60));
        let got = cache.get("k").unwrap();
        assert_eq!(got, entry("{\"n\":1}"));
    }

    #[test]
    fn test_memory_overwrite_replaces_entry() {
        let cache = MemoryCache::new();
        cache.set("k", entry("old"), Duration::from_secs(60));
        cache.set("k", entry("new"), Duration::from_secs(60));
        assert_eq!(cache.get("k").unwrap().body, b"new");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_expiry() {
        let cache = MemoryCache::new();
        cache.set("k", entry("x"), Duration::from_millis(40));
        assert!(cache.get("k").is_some());

        sleep(Duration::from_millis(60));
        assert!(cache.get("k").is_none());
        // The stale entry was evicted by the read.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_zero_ttl_is_immediate_miss() {
        let cache = MemoryCache::new();
        cache.set("k", entry("x"), Duration::ZERO);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_memory_keys_are_independent() {
        let cache = MemoryCache::new();
        cache.set("a", entry("a"), Duration::from_secs(60));
        cache.set("b", entry("b"), Duration::from_secs(60));
        cache.set("a", entry("a2"), Duration::from_secs(60));
        assert_eq!(cache.get("b").unwrap().body, b"b");
    }

    #[test]
    fn test_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();

        cache.set("abc123", entry("{\"n\":1}"), Duration::from_secs(60));
        assert_eq!(cache.get("abc123").unwrap(), entry("{\"n\":1}"));
    }

    #[test]
    fn test_disk_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        DiskCache::new(dir.path())
            .unwrap()
            .set("abc123", entry("persisted"), Duration::from_secs(60));

        let reopened = DiskCache::new(dir.path()).unwrap();
        assert_eq!(reopened.get("abc123").unwrap().body, b"persisted");
    }

    #[test]
    fn test_disk_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();

        cache.set("abc123", entry("x"), Duration::from_secs(1));
        assert!(cache.get("abc123").is_some());

        sleep(Duration::from_millis(1100));
        assert!(cache.get("abc123").is_none());
        // The expired file was unlinked by the read.
        assert!(!dir.path().join("abc123.json").exists());
    }

    #[test]
    fn test_disk_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();

        fs::write(dir.path().join("abc123.json"), b"not json").unwrap();
        assert!(cache.get("abc123").is_none());
    }

    #[test]
    fn test_disk_unknown_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        assert!(cache.get("missing").is_none());
    }
}
