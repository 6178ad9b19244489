//! Group-cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use authgate_metrics::MetricTag;

/// Configuration for the group-membership cache decorator.
///
/// # Example (TOML)
///
/// ```toml
/// [provider.group_cache]
/// enabled = true
/// ttl = "10m"
/// sweep_interval = "1m"
/// tags = [{ key = "service", value = "sso-proxy" }]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupCacheConfig {
    /// Enable/disable caching entirely. When disabled, every validation
    /// consults the upstream provider.
    pub enabled: bool,

    /// How long a cached validation remains usable. Zero disables
    /// expiration (entries live until purged).
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// How often the background sweep reclaims expired entries.
    /// Defaults to the TTL when unset.
    #[serde(default, with = "humantime_serde::option")]
    pub sweep_interval: Option<Duration>,

    /// Fixed tags attached to every counter the cache emits.
    pub tags: Vec<MetricTag>,
}

impl Default for GroupCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(600), // 10 minutes
            sweep_interval: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cache_for_ten_minutes() {
        let config = GroupCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert!(config.sweep_interval.is_none());
        assert!(config.tags.is_empty());
    }

    #[test]
    fn parses_humantime_durations() {
        let config: GroupCacheConfig = serde_json::from_str(
            r#"{
                "ttl": "5m",
                "sweep_interval": "30s",
                "tags": [{ "key": "service", "value": "sso-proxy" }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.tags, vec![MetricTag::new("service", "sso-proxy")]);
    }
}
