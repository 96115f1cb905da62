//! Look-aside reads: consult the cache, fall back to the loader, populate best-effort.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::keys::CacheKey;
use super::store::CacheStore;
use super::{METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS};

/// How a value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache without touching the store.
    Hit,
    /// Loaded from the store and written back to the cache.
    Miss,
    /// No cache configured; loaded from the store.
    Bypass,
    /// The cache read failed; loaded from the store.
    Error,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value paired with the cache outcome that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> Cached<T> {
    pub fn new(value: T, status: CacheStatus) -> Self {
        Self { value, status }
    }

    pub fn bypass(value: T) -> Self {
        Self::new(value, CacheStatus::Bypass)
    }
}

#[derive(Clone)]
pub struct LookAsideCache {
    store: Arc<dyn CacheStore>,
}

impl LookAsideCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached value for `key`, or run `load` and cache its result for `ttl`.
    ///
    /// Cache failures never surface to the caller. A failed read degrades to the loader, an
    /// undecodable payload is discarded and reloaded, and a failed write is only logged.
    /// Loader errors propagate unchanged and nothing is cached for them.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let rendered = key.to_string();
        let kind = key.kind();

        let status = match self.store.get(&rendered).await {
            Ok(Some(payload)) => match serde_json::from_slice::<T>(&payload) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT, "kind" => kind).increment(1);
                    debug!(cache_key = %rendered, outcome = "hit", "serving cached value");
                    return Ok(Cached::new(value, CacheStatus::Hit));
                }
                Err(err) => {
                    warn!(
                        cache_key = %rendered,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                    if let Err(err) = self.store.delete(&rendered).await {
                        warn!(cache_key = %rendered, error = %err, "failed to drop corrupt entry");
                    }
                    CacheStatus::Miss
                }
            },
            Ok(None) => CacheStatus::Miss,
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "kind" => kind, "op" => "get").increment(1);
                warn!(
                    cache_key = %rendered,
                    error = %err,
                    "cache read failed, falling back to primary storage"
                );
                CacheStatus::Error
            }
        };

        let value = load().await?;

        if status == CacheStatus::Miss {
            counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
            self.populate(&rendered, kind, &value, ttl).await;
        }

        Ok(Cached::new(value, status))
    }

    async fn populate<T: Serialize>(&self, key: &str, kind: &'static str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => Bytes::from(payload),
            Err(err) => {
                warn!(cache_key = key, error = %err, "failed to serialize value for cache");
                return;
            }
        };

        match self.store.set(key, payload, ttl).await {
            Ok(()) => debug!(
                cache_key = key,
                ttl_secs = ttl.as_secs(),
                outcome = "populated",
                "cached value"
            ),
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "kind" => kind, "op" => "set").increment(1);
                warn!(cache_key = key, error = %err, "failed to populate cache after primary read");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};

    use super::*;
    use crate::cache::store::{CacheError, MemoryCacheStore};

    const TTL: Duration = Duration::from_secs(30);

    fn key() -> CacheKey {
        CacheKey::TaskList {
            status: None,
            priority: None,
            project_id: Some(7),
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl CacheStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Err(CacheError::connection("connection refused"))
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::connection("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::connection("connection refused"))
        }

        fn keys_matching(&self, _pattern: &str) -> BoxStream<'static, Result<String, CacheError>> {
            Box::pin(stream::iter([Err(CacheError::connection("connection refused"))]))
        }
    }

    /// Reads succeed as misses, writes are refused.
    #[derive(Default)]
    struct ReadOnlyStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::connection("READONLY replica"))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Ok(false)
        }

        fn keys_matching(&self, _pattern: &str) -> BoxStream<'static, Result<String, CacheError>> {
            Box::pin(stream::empty())
        }
    }

    #[test]
    fn failed_population_still_returns_loaded_value() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");

        let store = Arc::new(ReadOnlyStore::default());
        let cache = LookAsideCache::new(store.clone());
        let cached = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(cache.get_or_load(key(), TTL, || async {
                Ok::<_, std::io::Error>(vec![4, 2])
            }))
        })
        .expect("load");

        assert_eq!(cached, Cached::new(vec![4, 2], CacheStatus::Miss));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let set_errors: u64 = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(composite, _, _, _)| {
                let key = composite.key();
                key.name() == METRIC_CACHE_ERROR
                    && key
                        .labels()
                        .any(|label| label.key() == "op" && label.value() == "set")
            })
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum();
        assert_eq!(set_errors, 1);
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let store = Arc::new(MemoryCacheStore::default());
        let cache = LookAsideCache::new(store.clone());
        let loads = AtomicUsize::new(0);

        for expected in [CacheStatus::Miss, CacheStatus::Hit] {
            let cached = cache
                .get_or_load(key(), TTL, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>(vec![1, 2, 3])
                })
                .await
                .expect("load");
            assert_eq!(cached, Cached::new(vec![1, 2, 3], expected));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.live_keys(), vec!["tasks:-:-:7".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_entry_is_replaced() {
        let store = Arc::new(MemoryCacheStore::default());
        store
            .set("tasks:-:-:7", Bytes::from_static(b"not json"), TTL)
            .await
            .expect("seed corrupt entry");
        let cache = LookAsideCache::new(store.clone());

        let cached = cache
            .get_or_load(key(), TTL, || async { Ok::<_, std::io::Error>(vec![9]) })
            .await
            .expect("load");
        assert_eq!(cached.status, CacheStatus::Miss);

        let payload = store.get("tasks:-:-:7").await.expect("get");
        assert_eq!(payload, Some(Bytes::from_static(b"[9]")));
    }

    #[tokio::test]
    async fn unavailable_cache_falls_back_to_loader() {
        let cache = LookAsideCache::new(Arc::new(UnavailableStore));
        let cached = cache
            .get_or_load(key(), TTL, || async { Ok::<_, std::io::Error>("fresh".to_string()) })
            .await
            .expect("load");
        assert_eq!(cached, Cached::new("fresh".to_string(), CacheStatus::Error));
    }

    #[tokio::test]
    async fn loader_errors_propagate_and_cache_nothing() {
        let store = Arc::new(MemoryCacheStore::default());
        let cache = LookAsideCache::new(store.clone());
        let result = cache
            .get_or_load(key(), TTL, || async {
                Err::<Vec<u8>, _>(std::io::Error::other("store down"))
            })
            .await;
        assert!(result.is_err());
        assert!(store.live_keys().is_empty());
    }
}
