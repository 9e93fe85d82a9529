use chrono::{DateTime, Utc};
use corral_core::{SortValue, Sortable};
use serde::{Deserialize, Serialize};

/// Customer of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: String,
    pub total_amount: f64,
    #[serde(default)]
    pub remaining_balance: f64,
    #[serde(default)]
    pub region: String,
    /// Absent when the account was deleted.
    #[serde(default)]
    pub user: Option<OrderUser>,
}

impl Order {
    /// "First Last" of the customer, if still known.
    pub fn customer_name(&self) -> Option<String> {
        self.user
            .as_ref()
            .map(|user| format!("{} {}", user.first_name, user.last_name))
    }
}

impl Sortable for Order {
    /// Customer fields are reachable as `user.firstName`, `user.email`...
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        match field {
            "_id" | "id" => self.id.as_str().into(),
            "createdAt" => (self.created_at.timestamp_millis() as f64).into(),
            "status" => self.status.as_str().into(),
            "totalAmount" => self.total_amount.into(),
            "remainingBalance" => self.remaining_balance.into(),
            "region" => self.region.as_str().into(),
            "user.firstName" => self.user.as_ref().map(|u| u.first_name.as_str()).into(),
            "user.lastName" => self.user.as_ref().map(|u| u.last_name.as_str()).into(),
            "user.email" => self.user.as_ref().map(|u| u.email.as_str()).into(),
            _ => SortValue::Missing,
        }
    }
}
