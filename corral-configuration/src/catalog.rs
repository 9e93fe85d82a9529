//! Routes of the retail dashboard backend.

use corral_reqwest::{UpdateMethod, UpdateRoute};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::dashboard::{ApiConfig, DashboardConfig, Defaults};
use crate::resource::ResourceConfig;

pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";
pub const INVENTORY: &str = "inventory";
pub const CATEGORIES: &str = "categories";
pub const ORDERS: &str = "orders";
pub const ANALYTICS: &str = "analytics";

fn update(method: UpdateMethod, path: &str) -> Option<UpdateRoute> {
    Some(UpdateRoute {
        method,
        path: path.to_owned(),
    })
}

impl DashboardConfig {
    /// The dashboard's resources served from `base_url`, with default
    /// policies.
    pub fn builtin(base_url: impl Into<String>) -> Self {
        let resources: IndexMap<SmolStr, ResourceConfig> = [
            (
                PRODUCTS,
                ResourceConfig {
                    list: "/product/all".into(),
                    create: Some("/product/create".into()),
                    update: update(UpdateMethod::Put, "/product/{id}"),
                    delete: Some("/product/{id}".into()),
                    export: Some("/product/export".into()),
                    invalidates: vec![INVENTORY.into(), ANALYTICS.into()],
                    ..ResourceConfig::default()
                },
            ),
            (
                USERS,
                ResourceConfig {
                    list: "/user/all-users".into(),
                    create: Some("/user/register".into()),
                    update: update(UpdateMethod::Patch, "/user/update/{id}"),
                    delete: Some("/user/delete/{id}".into()),
                    import: Some("/user/employer-register".into()),
                    export: Some("/user/export".into()),
                    ..ResourceConfig::default()
                },
            ),
            (
                INVENTORY,
                ResourceConfig {
                    list: "/product/inventories".into(),
                    export: Some("/product/inventories/export".into()),
                    ..ResourceConfig::default()
                },
            ),
            (
                CATEGORIES,
                ResourceConfig {
                    list: "/role/".into(),
                    create: Some("/role/create-role".into()),
                    delete: Some("/role/delete-role/{id}".into()),
                    invalidates: vec![USERS.into()],
                    ..ResourceConfig::default()
                },
            ),
            (
                ORDERS,
                ResourceConfig {
                    list: "/order/get-all".into(),
                    delete: Some("/order/{id}".into()),
                    search_param: Some("searchTerm".into()),
                    invalidates: vec![ANALYTICS.into()],
                    ..ResourceConfig::default()
                },
            ),
            (
                ANALYTICS,
                ResourceConfig {
                    list: "/analytics/overview".into(),
                    ..ResourceConfig::default()
                },
            ),
        ]
        .into_iter()
        .map(|(name, resource)| (SmolStr::new_static(name), resource))
        .collect();

        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                token: None,
                timeout: None,
            },
            defaults: Defaults::default(),
            resources,
        }
    }
}
