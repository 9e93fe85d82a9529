use chrono::{DateTime, Utc};
use corral_core::{SortValue, Sortable};
use serde::{Deserialize, Serialize};

/// A job or role employees and products are grouped by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub role_title: String,
    /// Cover image URL.
    #[serde(default)]
    pub images: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Sortable for Category {
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        match field {
            "_id" | "id" => self.id.as_str().into(),
            "roleTitle" => self.role_title.as_str().into(),
            "createdAt" => self.created_at.map(|at| at.timestamp_millis() as f64).into(),
            _ => SortValue::Missing,
        }
    }
}
