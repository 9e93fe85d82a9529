//! Records of the dashboard backend.
//!
//! Every record deserializes from the backend's camelCase JSON with its id
//! under `_id`, and implements [`Sortable`](corral_core::Sortable) so that
//! unpaginated collections can be ordered locally.

mod analytics;
mod category;
mod inventory;
mod order;
mod product;
mod user;

pub use analytics::Analytics;
pub use category::Category;
pub use inventory::InventoryItem;
pub use order::{Order, OrderUser};
pub use product::Product;
pub use user::User;

use serde::{Deserialize, Serialize};

/// An uploaded image: either a bare URL or a hosted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// Plain URL.
    Url(String),
    /// Asset with its storage id.
    Asset {
        url: String,
        #[serde(rename = "publicId")]
        public_id: String,
    },
}

impl ImageRef {
    /// URL to display.
    pub fn url(&self) -> &str {
        match self {
            ImageRef::Url(url) | ImageRef::Asset { url, .. } => url,
        }
    }
}

/// Whether a record is shown to customers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn image_accepts_url_or_asset() {
        let images: Vec<ImageRef> = serde_json::from_value(json!([
            "https://cdn.example.com/a.png",
            {"url": "https://cdn.example.com/b.png", "publicId": "products/b"}
        ]))
        .unwrap();
        let urls: Vec<&str> = images.iter().map(ImageRef::url).collect();
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"]
        );
        assert!(matches!(&images[1], ImageRef::Asset { public_id, .. } if public_id == "products/b"));
    }
}
