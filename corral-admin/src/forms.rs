//! Input forms of the dashboard.
//!
//! Every form is checked with [`validator`] before anything is sent, so an
//! invalid form never reaches the backend. Forms carrying files are sent as
//! multipart, the others as JSON.

use bytes::Bytes;
use corral_core::FormPart;
use serde::Serialize;
use validator::Validate;

use crate::model::RecordStatus;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// A CSV file.
    pub fn csv(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(file_name, "text/csv", bytes)
    }

    pub(crate) fn part(&self, name: &str) -> FormPart {
        FormPart::file(
            name,
            self.file_name.clone(),
            self.content_type.clone(),
            self.bytes.clone(),
        )
    }
}

/// A new catalog article, sent as multipart with its images.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 3))]
    pub title: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(length(min = 1))]
    pub kind: String,
    #[validate(length(min = 1))]
    pub size: String,
    #[validate(range(min = 0.01))]
    pub price: f64,
    #[validate(range(min = 0))]
    pub available_quantity: i64,
    pub status: RecordStatus,
    #[validate(length(min = 1))]
    pub role: String,
    pub sku: Option<String>,
    pub region: Option<String>,
    /// Sent as repeated `image` parts.
    pub images: Vec<Upload>,
}

impl CreateProduct {
    pub(crate) fn to_multipart(&self) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("title", self.title.as_str()),
            FormPart::text("description", self.description.as_str()),
            FormPart::text("type", self.kind.as_str()),
            FormPart::text("size", self.size.as_str()),
            FormPart::text("price", self.price.to_string()),
            FormPart::text("availableQuantity", self.available_quantity.to_string()),
            FormPart::text("status", self.status.as_str()),
            FormPart::text("role", self.role.as_str()),
        ];
        if let Some(sku) = &self.sku {
            parts.push(FormPart::text("sku", sku.as_str()));
        }
        if let Some(region) = &self.region {
            parts.push(FormPart::text("region", region.as_str()));
        }
        parts.extend(self.images.iter().map(|image| image.part("image")));
        parts
    }
}

/// Changes to an article. Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub available_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A new employee account.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddUser {
    #[validate(length(min = 2))]
    pub first_name: String,
    #[validate(length(min = 2))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 10))]
    pub phone_number: String,
    #[validate(length(min = 5))]
    pub home_address: String,
    #[validate(length(min = 2))]
    pub city: String,
    #[validate(length(min = 2))]
    pub region: String,
    #[validate(length(min = 1))]
    pub category_name: String,
    #[validate(length(min = 2))]
    pub location: String,
    #[validate(range(min = 0.0))]
    pub balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Changes to an employee account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2))]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10))]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

/// New spending allowance of one employee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Validate)]
pub struct BalanceUpdate {
    #[validate(range(min = 0.0))]
    pub balance: f64,
}

/// A new job category, with an optional cover image.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewCategory {
    #[validate(length(min = 2))]
    pub role_title: String,
    pub image: Option<Upload>,
}

impl NewCategory {
    pub(crate) fn to_multipart(&self) -> Vec<FormPart> {
        let mut parts = vec![FormPart::text("roleTitle", self.role_title.as_str())];
        parts.extend(self.image.iter().map(|image| image.part("images")));
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::PartValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn boots() -> CreateProduct {
        CreateProduct {
            title: "Safety boots".into(),
            description: "Steel toe, size range 38-46".into(),
            kind: "footwear".into(),
            size: "42".into(),
            price: 49.5,
            available_quantity: 12,
            status: RecordStatus::Active,
            role: "warehouse".into(),
            sku: Some("SB-42".into()),
            region: None,
            images: vec![Upload::new("boots.png", "image/png", &b"png"[..])],
        }
    }

    #[test]
    fn product_form_is_sent_as_text_and_image_parts() {
        let parts = boots().to_multipart();
        let names: Vec<&str> = parts.iter().map(|part| part.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "title",
                "description",
                "type",
                "size",
                "price",
                "availableQuantity",
                "status",
                "role",
                "sku",
                "image"
            ]
        );
        assert_eq!(parts[4].value, PartValue::Text("49.5".into()));
        assert!(matches!(&parts[9].value, PartValue::File { file_name, .. } if file_name == "boots.png"));
    }

    #[test]
    fn free_product_is_rejected() {
        let mut product = boots();
        product.price = 0.0;
        product.title = "ab".into();
        let errors = product.validate().unwrap_err();
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        assert_eq!(fields, vec!["price", "title"]);
    }

    #[test]
    fn partial_update_only_sends_given_fields() {
        let update = UpdateProduct {
            price: Some(10.0),
            status: Some(RecordStatus::Inactive),
            ..UpdateProduct::default()
        };
        update.validate().unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"price": 10.0, "status": "inactive"})
        );
    }

    #[test]
    fn user_email_is_checked() {
        let update = UpdateUser {
            email: Some("not-an-email".into()),
            ..UpdateUser::default()
        };
        assert!(update.validate().is_err());
        assert!(BalanceUpdate { balance: -1.0 }.validate().is_err());
    }

    #[test]
    fn category_image_goes_under_images() {
        let category = NewCategory {
            role_title: "Drivers".into(),
            image: Some(Upload::new("cover.jpg", "image/jpeg", &b"jpg"[..])),
        };
        let parts = category.to_multipart();
        assert_eq!(parts[0], FormPart::text("roleTitle", "Drivers"));
        assert_eq!(parts[1].name, "images");
    }
}
