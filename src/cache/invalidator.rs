//! Purges every task list entry after a committed write.

use std::sync::Arc;

use futures::StreamExt;
use metrics::counter;
use tracing::{debug, warn};

use super::keys::TASK_LIST_PATTERN;
use super::store::CacheStore;
use super::{METRIC_INVALIDATED_KEYS, METRIC_INVALIDATION_FAILED};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub deleted: usize,
    pub failures: usize,
}

impl InvalidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

#[derive(Clone)]
pub struct TaskCacheInvalidator {
    store: Arc<dyn CacheStore>,
}

impl TaskCacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Delete all `tasks:*` entries. The dashboard snapshot is left alone.
    ///
    /// Never fails: scan and delete errors are logged and counted in the outcome.
    pub async fn invalidate_task_caches(&self) -> InvalidationOutcome {
        let mut outcome = InvalidationOutcome::default();
        let mut keys = self.store.keys_matching(TASK_LIST_PATTERN);

        while let Some(next) = keys.next().await {
            match next {
                Ok(key) => match self.store.delete(&key).await {
                    Ok(true) => outcome.deleted += 1,
                    Ok(false) => {}
                    Err(err) => {
                        outcome.failures += 1;
                        warn!(cache_key = %key, error = %err, "failed to delete task list entry");
                    }
                },
                Err(err) => {
                    outcome.failures += 1;
                    warn!(
                        pattern = TASK_LIST_PATTERN,
                        error = %err,
                        "task list key scan failed"
                    );
                    break;
                }
            }
        }

        counter!(METRIC_INVALIDATED_KEYS).increment(outcome.deleted as u64);
        if outcome.failures > 0 {
            counter!(METRIC_INVALIDATION_FAILED).increment(1);
        }
        debug!(
            deleted = outcome.deleted,
            failures = outcome.failures,
            "task list cache invalidated"
        );

        outcome
    }
}
