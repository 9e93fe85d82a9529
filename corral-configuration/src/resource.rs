use corral::PolicyConfig;
use corral_reqwest::{Endpoints, UpdateRoute};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One resource of the backend: routes, cache policy and dependents.
///
/// ```yaml
/// list: /product/all
/// create: /product/create
/// update: { method: PUT, path: /product/{id} }
/// delete: /product/{id}
/// export: /product/export
/// invalidates: [inventory]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Collection route.
    pub list: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
    /// Search query parameter; `search` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_param: Option<SmolStr>,
    /// Overrides the default page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Overrides the default cache policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyConfig>,
    /// Resources whose cached views a write to this one makes stale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidates: Vec<SmolStr>,
}

impl ResourceConfig {
    /// Routes as understood by the REST client.
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::new(self.list.clone());
        endpoints.create.clone_from(&self.create);
        endpoints.update.clone_from(&self.update);
        endpoints.delete.clone_from(&self.delete);
        endpoints.import.clone_from(&self.import);
        endpoints.export.clone_from(&self.export);
        if let Some(param) = &self.search_param {
            endpoints = endpoints.search_param(param.clone());
        }
        endpoints
    }
}
