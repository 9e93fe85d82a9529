use corral_core::{SortValue, Sortable};
use serde::{Deserialize, Serialize};

use super::ImageRef;

/// Stock of one product at a regional office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub available_quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    /// Units ordered across all orders.
    #[serde(default)]
    pub total_ordered_quantity: i64,
}

impl InventoryItem {
    /// Units neither ordered nor reserved.
    pub fn remaining(&self) -> i64 {
        self.available_quantity - self.total_ordered_quantity
    }
}

impl Sortable for InventoryItem {
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        match field {
            "_id" | "id" => self.id.as_str().into(),
            "title" => self.title.as_str().into(),
            "type" => self.kind.as_str().into(),
            "size" => self.size.as_str().into(),
            "price" => self.price.into(),
            "availableQuantity" => (self.available_quantity as f64).into(),
            "totalOrderedQuantity" => (self.total_ordered_quantity as f64).into(),
            "role" => self.role.as_str().into(),
            "status" => self.status.as_str().into(),
            _ => SortValue::Missing,
        }
    }
}
