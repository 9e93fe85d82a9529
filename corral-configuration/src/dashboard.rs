use std::path::Path;
use std::time::Duration;

use corral::debounce::DEFAULT_DEBOUNCE;
use corral::controller::DEFAULT_PAGE_SIZE;
use corral::{CacheConfig, ControllerConfig, MutationGateway, PolicyConfig};
use corral_reqwest::RestClient;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::ConfigError;
use crate::resource::ResourceConfig;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_debounce() -> Duration {
    DEFAULT_DEBOUNCE
}

/// Janitor period when no resource stores anything.
pub const DEFAULT_JANITOR_PERIOD: Duration = Duration::from_secs(60);

const MIN_JANITOR_PERIOD: Duration = Duration::from_millis(10);

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Absolute URL every route is relative to.
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout (e.g. "30s").
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Settings shared by every resource unless overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Search quiet period (e.g. "500ms").
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Loads running longer than this fail with a timeout.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub load_timeout: Option<Duration>,
    /// How often expired, unused entries are evicted (e.g. "1m"). Defaults
    /// to the shortest expire window.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub janitor: Option<Duration>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            policy: PolicyConfig::default(),
            load_timeout: None,
            janitor: None,
        }
    }
}

/// Configuration of a whole dashboard.
///
/// ```yaml
/// api:
///   base_url: https://api.example.com
/// defaults:
///   page_size: 10
///   debounce: 500ms
///   policy: { Enabled: { stale: 5m, expire: 10m } }
/// resources:
///   products:
///     list: /product/all
///     invalidates: [inventory]
///   inventory:
///     list: /product/inventories
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: Defaults,
    /// Resources in declaration order.
    #[serde(default)]
    pub resources: IndexMap<SmolStr, ResourceConfig>,
}

impl DashboardConfig {
    /// Parses and validates YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_saphyr::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading dashboard configuration");
        Self::from_yaml(&yaml)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.api.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.clone()));
        }

        let defaults = SmolStr::new_static("defaults");
        check_page_size(&defaults, Some(self.defaults.page_size))?;
        check_policy(&defaults, Some(&self.defaults.policy))?;

        for (name, resource) in &self.resources {
            check_page_size(name, resource.page_size)?;
            check_policy(name, resource.policy.as_ref())?;
            if let Some(path) = resource.endpoints().paths().find(|p| !p.starts_with('/')) {
                return Err(ConfigError::InvalidPath {
                    resource: name.clone(),
                    path: path.to_owned(),
                });
            }
            if let Some(dependent) = resource
                .invalidates
                .iter()
                .find(|dependent| !self.resources.contains_key(*dependent))
            {
                return Err(ConfigError::UnknownDependent {
                    resource: name.clone(),
                    dependent: dependent.clone(),
                });
            }
        }
        Ok(())
    }

    /// Configuration of a resource.
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(name)
    }

    /// Cache policies: the default plus every per-resource override.
    pub fn cache_config(&self) -> CacheConfig {
        let mut cache = CacheConfig::new(self.defaults.policy);
        cache.load_timeout = self.defaults.load_timeout;
        for (name, resource) in &self.resources {
            if let Some(policy) = resource.policy {
                cache = cache.resource(name.clone(), policy);
            }
        }
        cache
    }

    /// Period of the cache janitor: the configured one, else the shortest
    /// expire window of any policy. Never below 10ms.
    pub fn janitor_period(&self) -> Duration {
        let period = self.defaults.janitor.unwrap_or_else(|| {
            std::iter::once(&self.defaults.policy)
                .chain(self.resources.values().filter_map(|r| r.policy.as_ref()))
                .filter_map(PolicyConfig::windows)
                .map(|windows| windows.expire)
                .min()
                .unwrap_or(DEFAULT_JANITOR_PERIOD)
        });
        period.max(MIN_JANITOR_PERIOD)
    }

    /// Initial controller settings of `resource`.
    pub fn controller_config(&self, resource: &str) -> ControllerConfig {
        let config = ControllerConfig::default()
            .page_size(self.defaults.page_size)
            .debounce(self.defaults.debounce);
        match self.resources.get(resource) {
            Some(resource) => {
                let config = config.page_size(resource.page_size.unwrap_or(self.defaults.page_size));
                match &resource.search_param {
                    Some(param) => config.search_param(param.clone()),
                    None => config,
                }
            }
            None => config,
        }
    }

    /// REST client knowing every configured resource.
    pub fn rest_client(&self) -> Result<RestClient, ConfigError> {
        let mut builder = RestClient::builder(self.api.base_url.clone()).resources(
            self.resources
                .iter()
                .map(|(name, resource)| (name.clone(), resource.endpoints())),
        );
        if let Some(token) = &self.api.token {
            builder = builder.bearer_token(token.clone());
        }
        if let Some(timeout) = self.api.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Registers every `invalidates` dependency on `gateway`.
    pub fn register_dependents(&self, gateway: MutationGateway) -> MutationGateway {
        self.resources
            .iter()
            .filter(|(_, resource)| !resource.invalidates.is_empty())
            .fold(gateway, |gateway, (name, resource)| {
                gateway.with_dependents(name.clone(), resource.invalidates.iter().cloned())
            })
    }
}

fn check_page_size(scope: &SmolStr, page_size: Option<u32>) -> Result<(), ConfigError> {
    if page_size == Some(0) {
        return Err(ConfigError::InvalidPageSize {
            scope: scope.clone(),
        });
    }
    Ok(())
}

fn check_policy(scope: &SmolStr, policy: Option<&PolicyConfig>) -> Result<(), ConfigError> {
    match policy.and_then(PolicyConfig::windows) {
        Some(windows) if windows.expire < windows.stale => Err(ConfigError::InvalidPolicy {
            scope: scope.clone(),
        }),
        _ => Ok(()),
    }
}
