//! Write operations against the backend and their results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// What a mutation does to its resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Create a record (`POST {create}`).
    Create,
    /// Update the record `id` (`PUT|PATCH {update}`).
    Update {
        /// Record identifier.
        id: SmolStr,
    },
    /// Delete the record `id` (`DELETE {delete}`).
    Delete {
        /// Record identifier.
        id: SmolStr,
    },
    /// Bulk import from an uploaded file (`POST {import}`).
    Import,
}

impl MutationKind {
    /// Short name for logs and metrics labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update { .. } => "update",
            MutationKind::Delete { .. } => "delete",
            MutationKind::Import => "import",
        }
    }
}

/// Content of a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    /// A plain text field.
    Text(String),
    /// An uploaded file.
    File {
        /// File name sent to the backend.
        file_name: String,
        /// MIME type, e.g. `text/csv`.
        content_type: String,
        /// File content.
        bytes: Bytes,
    },
}

/// One named part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field content.
    pub value: PartValue,
}

impl FormPart {
    /// A text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }

    /// A file field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            value: PartValue::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        }
    }
}

/// Request body of a mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(Value),
    /// An url-encoded form.
    Form(Vec<(String, String)>),
    /// A multipart form, used for file uploads.
    Multipart(Vec<FormPart>),
}

impl Payload {
    /// Serializes `value` into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }
}

/// A write against one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Owning resource, e.g. `"products"`.
    pub resource: SmolStr,
    /// Operation.
    pub kind: MutationKind,
    /// Request body.
    pub payload: Payload,
}

impl Mutation {
    /// Creates a mutation.
    pub fn new(resource: impl Into<SmolStr>, kind: MutationKind, payload: Payload) -> Self {
        Self {
            resource: resource.into(),
            kind,
            payload,
        }
    }

    /// `Create` with a body.
    pub fn create(resource: impl Into<SmolStr>, payload: Payload) -> Self {
        Self::new(resource, MutationKind::Create, payload)
    }

    /// `Update` of `id` with a body.
    pub fn update(resource: impl Into<SmolStr>, id: impl Into<SmolStr>, payload: Payload) -> Self {
        Self::new(resource, MutationKind::Update { id: id.into() }, payload)
    }

    /// `Delete` of `id`.
    pub fn delete(resource: impl Into<SmolStr>, id: impl Into<SmolStr>) -> Self {
        Self::new(resource, MutationKind::Delete { id: id.into() }, Payload::Empty)
    }

    /// `Import` of a file uploaded under the field `field`.
    pub fn import(
        resource: impl Into<SmolStr>,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let part = FormPart::file(field, file_name, "text/csv", bytes);
        Self::new(resource, MutationKind::Import, Payload::Multipart(vec![part]))
    }
}

fn default_success() -> bool {
    true
}

/// Reply of the backend to a mutation: `{ success, message, data? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Whether the backend accepted the operation. Absent means accepted.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Human readable outcome.
    #[serde(default)]
    pub message: String,
    /// Optional payload (created record, import summary...).
    #[serde(default)]
    pub data: Option<Value>,
}

/// Outcome of a mutation as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Message to show to the user.
    pub message: String,
    /// Resources whose cached views were invalidated.
    pub affected: Vec<SmolStr>,
    /// Optional payload returned by the backend.
    pub data: Option<Value>,
}

impl MutationResult {
    /// Decodes `data` as the summary of a bulk import.
    pub fn import_summary(&self) -> Option<ImportSummary> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Identifier of the row (e.g. the e-mail).
    pub identifier: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Summary of a CSV bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows in the file.
    pub total: u64,
    /// Rows imported.
    pub success: u64,
    /// Rows rejected.
    pub failed: u64,
    /// Per-row rejection reasons.
    #[serde(default)]
    pub errors: Vec<ImportFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_success_flag_means_accepted() {
        let reply: MutationResponse = serde_json::from_value(json!({"message": "ok"})).unwrap();
        assert!(reply.success);
        assert_eq!(reply.data, None);
    }

    #[test]
    fn import_summary_is_decoded_from_data() {
        let result = MutationResult {
            success: true,
            message: "Imported".into(),
            affected: vec!["users".into()],
            data: Some(json!({
                "total": 3,
                "success": 2,
                "failed": 1,
                "errors": [{"identifier": "bob@example.com", "reason": "duplicate email"}]
            })),
        };
        let summary = result.import_summary().unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].identifier, "bob@example.com");
    }

    #[test]
    fn import_builds_csv_part() {
        let mutation = Mutation::import("users", "file", "users.csv", "a,b\n");
        match mutation.payload {
            Payload::Multipart(parts) => {
                assert_eq!(parts[0].name, "file");
                assert!(matches!(
                    &parts[0].value,
                    PartValue::File { content_type, .. } if content_type == "text/csv"
                ));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
