//! Configuration for app stores.

use common::storage::config::StorageConfig;

/// Configuration shared by every app store created from one registry.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base storage configuration. Each app store receives its own scoped
    /// namespace derived from this.
    pub storage: StorageConfig,

    /// How many days of daily statistics each app retains.
    pub stats_retention_days: u32,

    /// Result cap applied to queries that do not specify a `limit`.
    pub default_query_limit: usize,

    /// Capacity of each app's command queue. A full queue makes dispatch
    /// report backpressure instead of waiting.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            stats_retention_days: 30,
            default_query_limit: 100,
            queue_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_durable_storage_and_thirty_day_retention() {
        // given/when
        let config = Config::default();

        // then
        assert!(matches!(config.storage, StorageConfig::SlateDb(_)));
        assert_eq!(config.stats_retention_days, 30);
        assert_eq!(config.default_query_limit, 100);
    }
}
