use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Time after which cached data is served but refreshed in the background.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);
/// Time after which cached data is discarded.
pub const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(10 * 60);

fn default_stale() -> Duration {
    DEFAULT_STALE_AFTER
}

fn default_expire() -> Duration {
    DEFAULT_EXPIRE_AFTER
}

/// Freshness windows of an enabled cache policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct EnabledCacheConfig {
    /// Age at which an entry turns stale (e.g. "5m", "30s").
    #[serde(default = "default_stale", with = "humantime_serde")]
    pub stale: Duration,
    /// Age at which an entry expires; never earlier than `stale`.
    #[serde(default = "default_expire", with = "humantime_serde")]
    pub expire: Duration,
}

impl Default for EnabledCacheConfig {
    fn default() -> Self {
        Self {
            stale: DEFAULT_STALE_AFTER,
            expire: DEFAULT_EXPIRE_AFTER,
        }
    }
}

impl EnabledCacheConfig {
    /// Creates windows, raising `expire` to `stale` if needed.
    pub fn new(stale: Duration, expire: Duration) -> Self {
        Self {
            stale,
            expire: expire.max(stale),
        }
    }
}

/// Caching policy of one resource.
///
/// A disabled resource still shares one in-flight load between concurrent
/// callers, it just never keeps the result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum PolicyConfig {
    /// Results are kept for the configured windows.
    Enabled(EnabledCacheConfig),
    /// Results are never kept.
    Disabled,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Enabled(EnabledCacheConfig::default())
    }
}

impl PolicyConfig {
    /// Shorthand for an enabled policy with the given windows.
    pub fn enabled(stale: Duration, expire: Duration) -> Self {
        Self::Enabled(EnabledCacheConfig::new(stale, expire))
    }

    /// Windows of an enabled policy.
    pub fn windows(&self) -> Option<EnabledCacheConfig> {
        match self {
            PolicyConfig::Enabled(config) => Some(*config),
            PolicyConfig::Disabled => None,
        }
    }
}

/// Cache-wide configuration: a default policy plus per-resource overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CacheConfig {
    /// Policy of resources without an override.
    #[serde(default)]
    pub default: PolicyConfig,
    /// Per-resource overrides, keyed by exact resource name.
    #[serde(default)]
    pub resources: HashMap<SmolStr, PolicyConfig>,
    /// Loads running longer than this fail with a timeout.
    #[serde(default, with = "humantime_serde")]
    pub load_timeout: Option<Duration>,
}

impl CacheConfig {
    /// Creates a configuration with the given default policy.
    pub fn new(default: PolicyConfig) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Overrides the policy of `resource`.
    #[must_use]
    pub fn resource(mut self, resource: impl Into<SmolStr>, policy: PolicyConfig) -> Self {
        self.resources.insert(resource.into(), policy);
        self
    }

    /// Sets the load timeout.
    #[must_use]
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Resolves the policy of `resource`.
    pub fn policy_for(&self, resource: &str) -> PolicyConfig {
        self.resources
            .get(resource)
            .copied()
            .unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_five_and_ten_minutes() {
        let windows = PolicyConfig::default().windows().unwrap();
        assert_eq!(windows.stale, Duration::from_secs(300));
        assert_eq!(windows.expire, Duration::from_secs(600));
    }

    #[test]
    fn resource_override_wins() {
        let config = CacheConfig::default().resource("analytics", PolicyConfig::Disabled);
        assert_eq!(config.policy_for("analytics"), PolicyConfig::Disabled);
        assert_eq!(config.policy_for("products"), PolicyConfig::default());
    }

    #[test]
    fn expire_is_raised_to_stale() {
        let windows = EnabledCacheConfig::new(Duration::from_secs(60), Duration::from_secs(10));
        assert_eq!(windows.expire, Duration::from_secs(60));
    }

    #[test]
    fn parses_humantime_windows() {
        let policy: PolicyConfig =
            serde_json::from_str(r#"{"Enabled": {"stale": "30s", "expire": "2m"}}"#).unwrap();
        assert_eq!(
            policy,
            PolicyConfig::enabled(Duration::from_secs(30), Duration::from_secs(120))
        );
    }
}
