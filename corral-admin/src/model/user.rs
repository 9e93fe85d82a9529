use chrono::{DateTime, Utc};
use corral_core::{SortValue, Sortable};
use serde::{Deserialize, Serialize};

use super::RecordStatus;

/// An employee account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub home_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Job category the employee belongs to.
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Spending allowance.
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Sortable for User {
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        match field {
            "_id" | "id" => self.id.as_str().into(),
            "firstName" => self.first_name.as_str().into(),
            "lastName" => self.last_name.as_str().into(),
            "email" => self.email.as_str().into(),
            "role" => self.role.as_str().into(),
            "city" => self.city.as_deref().into(),
            "region" => self.region.as_deref().into(),
            "categoryName" => self.category_name.as_deref().into(),
            "balance" => self.balance.into(),
            "status" => self.status.map(RecordStatus::as_str).into(),
            "createdAt" => self.created_at.map(|at| at.timestamp_millis() as f64).into(),
            _ => SortValue::Missing,
        }
    }
}
