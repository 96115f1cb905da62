//! Cache configuration.

use std::time::Duration;

const DEFAULT_TASK_LIST_TTL: Duration = Duration::from_secs(30);
const DEFAULT_DASHBOARD_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false no cache store is consulted and reads report `Bypass`.
    pub enabled: bool,
    /// Lifetime of a filtered task list entry.
    pub task_list_ttl: Duration,
    /// Lifetime of the dashboard snapshot. Mutations never shorten it.
    pub dashboard_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            task_list_ttl: DEFAULT_TASK_LIST_TTL,
            dashboard_ttl: DEFAULT_DASHBOARD_TTL,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            task_list_ttl: settings.task_list_ttl,
            dashboard_ttl: settings.dashboard_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.task_list_ttl.as_secs(), 30);
        assert_eq!(config.dashboard_ttl.as_secs(), 10);
    }
}
