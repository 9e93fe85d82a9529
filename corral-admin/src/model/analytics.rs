use serde::{Deserialize, Serialize};

/// Headline figures of the overview screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub total_users: u64,
}
