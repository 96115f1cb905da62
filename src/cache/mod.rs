//! Taskmaster cache system
//!
//! Look-aside caching for the two hot read paths:
//!
//! - **Task lists**: one entry per filter combination under `tasks:{status}:{priority}:{project}`,
//!   purged as a group by `tasks:*` after every committed task write.
//! - **Dashboard**: a single `dashboard:stats` snapshot that expires by TTL only.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! redis_url = "redis://127.0.0.1:6379"
//! task_list_ttl_seconds = 30
//! dashboard_ttl_seconds = 10
//! ```

mod config;
mod invalidator;
mod keys;
mod lookaside;
mod store;

use std::sync::Arc;

pub use config::CacheConfig;
pub use invalidator::{InvalidationOutcome, TaskCacheInvalidator};
pub use keys::{
    CacheKey, DASHBOARD_STATS_KEY, TASK_LIST_PATTERN, TASK_LIST_PREFIX, task_list_key,
};
pub use lookaside::{CacheStatus, Cached, LookAsideCache};
pub use store::{CacheError, CacheStore, MemoryCacheStore, glob_matches};

pub const METRIC_CACHE_HIT: &str = "taskmaster_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "taskmaster_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "taskmaster_cache_error_total";
pub const METRIC_INVALIDATED_KEYS: &str = "taskmaster_cache_invalidated_keys_total";
pub const METRIC_INVALIDATION_FAILED: &str = "taskmaster_cache_invalidation_failed_total";

/// Look-aside reader and invalidator sharing one store, handed to services as
/// `Option<Arc<CacheLayer>>` (`None` when caching is disabled).
pub struct CacheLayer {
    config: CacheConfig,
    lookaside: LookAsideCache,
    invalidator: TaskCacheInvalidator,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            lookaside: LookAsideCache::new(store.clone()),
            invalidator: TaskCacheInvalidator::new(store),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn lookaside(&self) -> &LookAsideCache {
        &self.lookaside
    }

    pub fn invalidator(&self) -> &TaskCacheInvalidator {
        &self.invalidator
    }
}
