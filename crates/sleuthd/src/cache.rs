//! Semantic result cache.
//!
//! Exact lookups go by a hash of the normalized query. On an exact miss the
//! caller may supply an embedding, and live entries whose embedding is close
//! enough (cosine similarity at or above the threshold) answer the query as a
//! semantic hit. Entries expire passively after the TTL.
//!
//! All structure changes (insert, evict, promote) happen under one mutex.
//! The lock is never held while a compute or embedding future runs.

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CacheConfig;

/// Lowercased, trimmed form of a query
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// 16 hex chars of SHA-256 over the normalized query
pub fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(normalize_query(query).as_bytes());
    hex::encode(&digest[..8])
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// One cached result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub query: String,
    pub normalized_hash: String,
    pub embedding: Option<Vec<f32>>,
    pub results: String,
    pub created_at: Instant,
    pub hit_count: u64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub semantic_hits: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// Exact hits as a percentage of exact lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }
}

struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
    semantic_hits: u64,
    evictions: u64,
}

/// LRU + TTL cache of investigation results
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    similarity_threshold: f32,
    max_entries: usize,
}

impl ResultCache {
    /// * `max_entries` - capacity; values below 1 are raised to 1
    /// * `ttl` - entries older than this are treated as absent
    pub fn new(max_entries: usize, ttl: Duration, similarity_threshold: f32) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                semantic_hits: 0,
                evictions: 0,
            }),
            ttl,
            similarity_threshold,
            max_entries: capacity.get(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl(), config.similarity_threshold)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.created_at) > self.ttl
    }

    /// Exact lookup. A hit promotes the entry; an expired entry is evicted
    /// and reported as a miss.
    pub async fn get(&self, query: &str) -> Option<(String, Option<Vec<f32>>)> {
        let key = query_hash(query);
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let expired = match inner.entries.get_mut(&key) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.hit_count += 1;
                let found = (entry.results.clone(), entry.embedding.clone());
                inner.hits += 1;
                debug!(key = %key, "cache hit");
                return Some(found);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.pop(&key);
            debug!(key = %key, "cache entry expired");
        }
        inner.misses += 1;
        None
    }

    /// Best live entry by embedding similarity, counted as a semantic hit
    async fn semantic_lookup(&self, embedding: &[f32]) -> Option<String> {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let best = inner
            .entries
            .iter()
            .filter(|(_, e)| !self.is_expired(e, now))
            .filter_map(|(key, e)| {
                let other = e.embedding.as_deref()?;
                let score = cosine_similarity(embedding, other);
                (score >= self.similarity_threshold).then(|| (key.clone(), score))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let (key, score) = best?;
        let entry = inner.entries.get_mut(&key)?;
        entry.hit_count += 1;
        let results = entry.results.clone();
        inner.semantic_hits += 1;
        debug!(key = %key, score, "cache semantic hit");
        Some(results)
    }

    /// Exact lookup, then `compute` on a miss. The result is stored.
    pub async fn get_or_compute<F, Fut>(
        &self,
        query: &str,
        compute: F,
    ) -> anyhow::Result<(String, Option<Vec<f32>>)>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        if let Some(found) = self.get(query).await {
            return Ok(found);
        }
        let results = compute(query.to_string()).await?;
        self.set(query, results.clone(), None).await;
        Ok((results, None))
    }

    /// Exact lookup, then a similarity scan with the query's embedding, then
    /// `compute`. Failures of either callable are returned unchanged.
    pub async fn get_or_compute_semantic<F, Fut, E, EFut>(
        &self,
        query: &str,
        compute: F,
        embed: E,
    ) -> anyhow::Result<(String, Option<Vec<f32>>)>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
        E: FnOnce(String) -> EFut,
        EFut: Future<Output = anyhow::Result<Vec<f32>>>,
    {
        if let Some(found) = self.get(query).await {
            return Ok(found);
        }

        let embedding = embed(query.to_string()).await?;
        if let Some(results) = self.semantic_lookup(&embedding).await {
            return Ok((results, Some(embedding)));
        }

        let results = compute(query.to_string()).await?;
        self.set(query, results.clone(), Some(embedding.clone())).await;
        Ok((results, Some(embedding)))
    }

    /// Insert at the most recently used position, evicting the least
    /// recently used entry when full.
    pub async fn set(&self, query: &str, results: String, embedding: Option<Vec<f32>>) {
        let key = query_hash(query);
        let entry = CacheEntry {
            query: query.to_string(),
            normalized_hash: key.clone(),
            embedding,
            results,
            created_at: Instant::now(),
            hit_count: 0,
        };

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Some((evicted_key, evicted)) = inner.entries.push(key.clone(), entry) {
            // push also hands back the old value when the key was replaced
            if evicted_key != key {
                inner.evictions += 1;
                debug!(key = %evicted_key, query = %evicted.query, "cache eviction");
            }
        }
    }

    /// Remove one query, or everything when `query` is None
    pub async fn invalidate(&self, query: Option<&str>) {
        let mut inner = self.inner.lock().await;
        match query {
            Some(q) => {
                inner.entries.pop(&query_hash(q));
            }
            None => inner.entries.clear(),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.entries.pop(key);
        }
        expired_keys.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            semantic_hits: inner.semantic_hits,
            evictions: inner.evictions,
            size: inner.entries.len(),
            max_size: self.max_entries,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hit count of the entry for `query`, without promoting it
    pub async fn hit_count(&self, query: &str) -> Option<u64> {
        let inner = self.inner.lock().await;
        inner.entries.peek(&query_hash(query)).map(|e| e.hit_count)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_hash_normalizes() {
        assert_eq!(query_hash("  Why Is It Broken "), query_hash("why is it broken"));
        assert_eq!(query_hash("x").len(), 16);
        assert_ne!(query_hash("a"), query_hash("b"));
    }

    #[test]
    fn test_cosine() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = ResultCache::new(10, Duration::from_secs(60), 0.92);
        cache.set("q", "r".to_string(), None).await;
        assert_eq!(cache.get("q").await, Some(("r".to_string(), None)));
        assert_eq!(cache.get(" Q ").await.map(|(r, _)| r), Some("r".to_string()));
        assert_eq!(cache.hit_count("q").await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_counts_miss() {
        let cache = ResultCache::new(10, Duration::from_secs(300), 0.92);
        cache.set("q", "r".to_string(), None).await;
        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(cache.get("q").await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction_exactly_one() {
        let cache = ResultCache::new(3, Duration::from_secs(60), 0.92);
        for q in ["a", "b", "c"] {
            cache.set(q, q.to_uppercase(), None).await;
        }
        // touch "a" so "b" becomes least recently used
        assert!(cache.get("a").await.is_some());
        cache.set("d", "D".to_string(), None).await;

        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
        assert!(cache.hit_count("b").await.is_none());
        assert!(cache.hit_count("a").await.is_some());
    }

    #[tokio::test]
    async fn test_overwrite_is_not_eviction() {
        let cache = ResultCache::new(2, Duration::from_secs(60), 0.92);
        cache.set("a", "1".to_string(), None).await;
        cache.set("a", "2".to_string(), None).await;
        assert_eq!(cache.stats().await.evictions, 0);
        assert_eq!(cache.get("a").await.map(|(r, _)| r), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_get_or_compute_runs_once() {
        let cache = ResultCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            let (r, _) = cache
                .get_or_compute("why is my pod pending", |q| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("answer for {q}"))
                })
                .await
                .unwrap();
            assert_eq!(r, "answer for why is my pod pending");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_semantic_hit_counted_separately() {
        let cache = ResultCache::new(10, Duration::from_secs(60), 0.9);
        cache
            .get_or_compute_semantic(
                "why is eventhub failing",
                |_| async { Ok("rbac".to_string()) },
                |_| async { Ok(vec![1.0, 0.0, 0.1]) },
            )
            .await
            .unwrap();

        let (r, emb) = cache
            .get_or_compute_semantic(
                "eventhub failing why",
                |_| async { anyhow::bail!("must not compute") },
                |_| async { Ok(vec![0.98, 0.0, 0.12]) },
            )
            .await
            .unwrap();
        assert_eq!(r, "rbac");
        assert!(emb.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.semantic_hits, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(cache.hit_count("why is eventhub failing").await, Some(1));
    }

    #[tokio::test]
    async fn test_compute_failure_propagates_and_stores_nothing() {
        let cache = ResultCache::default();
        let err = cache
            .get_or_compute("q", |_| async { anyhow::bail!("llm unavailable") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "llm unavailable");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = ResultCache::default();
        cache.set("a", "1".to_string(), None).await;
        cache.set("b", "2".to_string(), None).await;
        cache.invalidate(Some("A")).await;
        assert_eq!(cache.len().await, 1);
        cache.invalidate(None).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let cache = ResultCache::new(10, Duration::from_secs(10), 0.92);
        cache.set("old", "1".to_string(), None).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("new", "2".to_string(), None).await;
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("new").await.is_some());
    }

    #[tokio::test]
    async fn test_hit_rate() {
        let cache = ResultCache::default();
        cache.set("a", "1".to_string(), None).await;
        cache.get("a").await;
        cache.get("a").await;
        cache.get("a").await;
        cache.get("missing").await;
        assert_eq!(cache.stats().await.hit_rate(), 75.0);
    }
}
