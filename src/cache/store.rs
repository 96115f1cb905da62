//! Cache storage port and the in-process implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use thiserror::Error;
use time::OffsetDateTime;

use crate::util::clock::{Clock, SystemClock};
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl CacheError {
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }

    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

/// Key/value store with per-entry expiry.
///
/// Implementations must never return an entry after its TTL has elapsed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a key. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Lazily enumerate keys matching a glob pattern (`*` and `?`).
    fn keys_matching(&self, pattern: &str) -> BoxStream<'static, Result<String, CacheError>>;
}

struct MemoryEntry {
    value: Bytes,
    expires_at: OffsetDateTime,
}

/// `HashMap`-backed store used when no Redis URL is configured, and by tests.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Sorted list of keys that have not expired yet.
    pub fn live_keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let entries = read_lock(&self.entries, SOURCE, "live_keys");
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn purge_if_expired(&self, key: &str, now: OffsetDateTime) {
        let mut entries = write_lock(&self.entries, SOURCE, "purge_expired");
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let now = self.clock.now();
        let lookup = {
            let entries = read_lock(&self.entries, SOURCE, "get");
            entries
                .get(key)
                .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()))
        };

        match lookup {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.purge_if_expired(key, now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let ttl = time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX);
        let expires_at = self.clock.now().saturating_add(ttl);
        write_lock(&self.entries, SOURCE, "set")
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = self.clock.now();
        let removed = write_lock(&self.entries, SOURCE, "delete").remove(key);
        Ok(removed.is_some_and(|entry| entry.expires_at > now))
    }

    fn keys_matching(&self, pattern: &str) -> BoxStream<'static, Result<String, CacheError>> {
        let now = self.clock.now();
        let matches: Vec<Result<String, CacheError>> = {
            let entries = read_lock(&self.entries, SOURCE, "keys_matching");
            entries
                .iter()
                .filter(|(key, entry)| entry.expires_at > now && glob_matches(pattern, key))
                .map(|(key, _)| Ok(key.clone()))
                .collect()
        };
        Box::pin(stream::iter(matches))
    }
}

/// Redis-style glob match supporting `*` (any run) and `?` (any single character).
pub fn glob_matches(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = candidate.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, resume)) => {
                    p = star + 1;
                    t = resume + 1;
                    backtrack = Some((star, resume + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
