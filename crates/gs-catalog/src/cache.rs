//! Response caching.
//!
//! Caches the bodies of successful GET responses per URL with a short TTL, so
//! that walking a catalog (list workspaces, then stores per workspace, then
//! resources per store) does not refetch the same listing over and over.
//!
//! Any successful write clears the whole cache. A changed store can invalidate
//! listings and cross references that live under unrelated URLs, and the
//! cache does not track those dependencies.

use std::collections::HashMap;
use std::time::Duration;

use metrics::counter;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default time a cached response stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Cached response body with fetch timestamp.
struct CachedResponse {
    body: String,
    fetched_at: Instant,
}

/// URL keyed cache of response bodies.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        debug!(ttl_ms = ttl.as_millis() as u64, "Initializing response cache");
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a cached body if still valid.
    pub async fn get(&self, url: &str) -> Option<String> {
        let guard = self.entries.read().await;
        if let Some(cached) = guard.get(url) {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!(url = %url, "Response cache hit");
                counter!("gsconfig_cache_hits_total").increment(1);
                return Some(cached.body.clone());
            }
            debug!(url = %url, "Response cache entry expired");
        }
        counter!("gsconfig_cache_misses_total").increment(1);
        None
    }

    /// Store a body, replacing any previous entry for the URL.
    pub async fn insert(&self, url: &str, body: String) {
        let mut guard = self.entries.write().await;
        guard.insert(
            url.to_string(),
            CachedResponse {
                body,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub async fn invalidate(&self) {
        let mut guard = self.entries.write().await;
        let dropped = guard.len();
        guard.clear();
        if dropped > 0 {
            info!(entries = dropped, "Response cache invalidated");
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:8080/geoserver/rest/workspaces.xml";

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let cache = ResponseCache::default();
        cache.insert(URL, "<workspaces/>".to_string()).await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("<workspaces/>"));
    }

    #[tokio::test]
    async fn test_cache_miss_when_empty() {
        let cache = ResponseCache::default();
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let cache = ResponseCache::new(Duration::from_secs(5));
        cache.insert(URL, "<workspaces/>".to_string()).await;

        tokio::time::advance(Duration::from_millis(4_900)).await;
        assert!(cache.get(URL).await.is_some());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_clears_every_url() {
        let cache = ResponseCache::default();
        cache.insert(URL, "a".to_string()).await;
        cache.insert("http://localhost:8080/geoserver/rest/styles.xml", "b".to_string()).await;

        cache.invalidate().await;

        assert!(cache.is_empty().await);
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_overwrites_on_insert() {
        let cache = ResponseCache::default();
        cache.insert(URL, "first".to_string()).await;
        cache.insert(URL, "second".to_string()).await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("second"));
        assert_eq!(cache.len().await, 1);
    }
}
