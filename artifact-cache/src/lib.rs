//! Content-addressed LRU cache (spec §4.2, C2).
//!
//! Keyed on `(provider, sha, path)`; values are raw bytes (file blobs or
//! serialized search results). The cache is process-local, safe under
//! concurrent reads, and serializes writes per key so that two concurrent
//! identical fetches produce exactly one upstream call (spec §8 scenario 6)
//! rather than racing each other into the map twice.

mod errors;

pub use errors::{CacheError, CacheResult};

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::debug;

pub const DEFAULT_BUDGET_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub bytes: Arc<Vec<u8>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub size: u64,
}

struct Inner {
    entries: HashMap<String, Arc<CacheEntry>>,
    /// Front = least recently used, back = most recently used.
    order: VecDeque<String>,
    total_bytes: u64,
}

pub struct ArtifactCache {
    inner: RwLock<Inner>,
    key_locks: RwLock<HashMap<String, Arc<AsyncMutex<()>>>>,
    budget_bytes: u64,
}

impl ArtifactCache {
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                total_bytes: 0,
            }),
            key_locks: RwLock::new(HashMap::new()),
            budget_bytes,
        }
    }

    /// First 16 hex chars of the SHA-256 of the normalized `(provider, sha, path)`
    /// triple — the `cacheKey` surfaced to clients (spec §3, §4.2).
    pub fn cache_key(provider: &str, sha: &str, path: &str) -> String {
        let normalized = format!("{provider}:{sha}:{path}");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 16)
    }

    /// Returns a cached entry without populating it. Exposed for callers that
    /// want to distinguish "not yet fetched" from the invariant-checking path.
    pub async fn peek(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.inner.read().await.entries.get(key).cloned()
    }

    /// Fetch-through accessor: returns the cached entry for `key` if present,
    /// otherwise serializes on a per-key lock and runs `fetch` exactly once,
    /// inserting (and evicting as needed) the result.
    pub async fn get_or_fetch<F, Fut>(&self, key: String, fetch: F) -> CacheResult<Arc<CacheEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, CacheError>>,
    {
        if let Some(hit) = self.inner.read().await.entries.get(&key).cloned() {
            self.touch(&key).await;
            return Ok(hit);
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        // Re-check after acquiring the per-key lock: another caller may have
        // populated it while we were waiting.
        if let Some(hit) = self.inner.read().await.entries.get(&key).cloned() {
            self.touch(&key).await;
            return Ok(hit);
        }

        let bytes = fetch().await?;
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            size: bytes.len() as u64,
            bytes: Arc::new(bytes),
            created_at: chrono::Utc::now(),
        });
        self.insert(key, entry.clone()).await;
        Ok(entry)
    }

    async fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        if let Some(l) = self.key_locks.read().await.get(key) {
            return l.clone();
        }
        let mut locks = self.key_locks.write().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn touch(&self, key: &str) {
        let mut inner = self.inner.write().await;
        if let Some(pos) = inner.order.iter().position(|k| k == key) {
            let k = inner.order.remove(pos).unwrap();
            inner.order.push_back(k);
        }
    }

    async fn insert(&self, key: String, entry: Arc<CacheEntry>) {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&key) {
            // Raced with another writer that already inserted under the same
            // key lock window; entries are content-addressed so this is a
            // no-op last-writer-wins (spec §5).
            return;
        }
        inner.total_bytes += entry.size;
        inner.entries.insert(key.clone(), entry);
        inner.order.push_back(key);

        while inner.total_bytes > self.budget_bytes {
            let Some(evict_key) = inner.order.pop_front() else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&evict_key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(evicted.size);
                debug!(key = %evict_key, "evicted cache entry");
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn total_bytes(&self) -> u64 {
        self.inner.read().await.total_bytes
    }
}

fn hex_prefix(bytes: &[u8], hex_chars: usize) -> String {
    let need_bytes = hex_chars.div_ceil(2);
    let mut s = String::with_capacity(hex_chars);
    for b in bytes.iter().take(need_bytes) {
        s.push_str(&format!("{b:02x}"));
    }
    s.truncate(hex_chars);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_key_is_stable_for_identical_inputs() {
        let a = ArtifactCache::cache_key("github", "deadbeef", "README.md");
        let b = ArtifactCache::cache_key("github", "deadbeef", "README.md");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn cache_key_differs_for_different_paths() {
        let a = ArtifactCache::cache_key("github", "deadbeef", "README.md");
        let b = ArtifactCache::cache_key("github", "deadbeef", "main.rs");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn concurrent_identical_fetches_hit_upstream_once() {
        let cache = Arc::new(ArtifactCache::new(DEFAULT_BUDGET_BYTES));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = ArtifactCache::cache_key("github", "sha1", "README.md");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        Ok(b"hello".to_vec())
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            let entry = h.await.unwrap();
            assert_eq!(&**entry.bytes, b"hello");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_beyond_budget() {
        let cache = ArtifactCache::new(10);
        cache
            .get_or_fetch("a".into(), || async { Ok(vec![0u8; 6]) })
            .await
            .unwrap();
        cache
            .get_or_fetch("b".into(), || async { Ok(vec![0u8; 6]) })
            .await
            .unwrap();
        assert!(cache.peek("a").await.is_none());
        assert!(cache.peek("b").await.is_some());
    }
}
