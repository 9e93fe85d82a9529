use chrono::{DateTime, Utc};
use corral_core::{SortValue, Sortable};
use serde::{Deserialize, Serialize};

use super::{ImageRef, RecordStatus};

/// An article of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub available_quantity: i64,
    #[serde(default)]
    pub status: RecordStatus,
    /// Job or role the product targets.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Misspelled region still sent for older records.
    #[serde(default, rename = "rigion", skip_serializing)]
    pub legacy_region: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Regional office, whichever spelling the record uses.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref().or(self.legacy_region.as_deref())
    }

    /// First image to show in a listing.
    pub fn thumbnail(&self) -> Option<&str> {
        self.image
            .as_ref()
            .or_else(|| self.images.first())
            .map(ImageRef::url)
    }
}

impl Sortable for Product {
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        match field {
            "_id" | "id" => self.id.as_str().into(),
            "title" => self.title.as_str().into(),
            "sku" => self.sku.as_deref().into(),
            "type" => self.kind.as_str().into(),
            "size" => self.size.as_str().into(),
            "price" => self.price.into(),
            "availableQuantity" => (self.available_quantity as f64).into(),
            "status" => self.status.as_str().into(),
            "region" => self.region().into(),
            "createdAt" => self.created_at.map(|at| at.timestamp_millis() as f64).into(),
            _ => SortValue::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_region_spelling_is_accepted() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1",
            "title": "Safety boots",
            "type": "footwear",
            "price": 49.5,
            "availableQuantity": 12,
            "status": "inactive",
            "rigion": "North",
            "images": [{"url": "https://cdn.example.com/boots.png", "publicId": "p/boots"}],
            "createdAt": "2025-03-01T10:00:00.000Z",
            "updatedAt": null
        }))
        .unwrap();

        assert_eq!(product.region(), Some("North"));
        assert_eq!(product.status, RecordStatus::Inactive);
        assert_eq!(product.thumbnail(), Some("https://cdn.example.com/boots.png"));
        assert!(product.created_at.is_some());
    }
}
