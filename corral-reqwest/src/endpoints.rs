//! Per-resource REST routes.

use corral_core::{FetchError, MutationKind};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Placeholder replaced by the record id in update and delete paths.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default query parameter carrying the search term.
pub const DEFAULT_SEARCH_PARAM: &str = "search";

/// HTTP method of an update route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateMethod {
    /// Full replacement.
    #[default]
    Put,
    /// Partial update.
    Patch,
}

impl From<UpdateMethod> for Method {
    fn from(method: UpdateMethod) -> Self {
        match method {
            UpdateMethod::Put => Method::PUT,
            UpdateMethod::Patch => Method::PATCH,
        }
    }
}

/// Method and templated path of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoute {
    /// `PUT` or `PATCH`.
    #[serde(default)]
    pub method: UpdateMethod,
    /// Path containing `{id}`.
    pub path: String,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma separated values.
    Csv,
    /// Printable document.
    Pdf,
}

impl ExportFormat {
    /// Path segment and file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Content type of the exported file.
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// Routes of one resource, relative to the client base URL.
///
/// Only `list` is mandatory; a mutation whose route is absent fails with
/// [`FetchError::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `GET` collection route.
    pub list: String,
    /// `POST` route creating a record.
    pub create: Option<String>,
    /// Route updating a record.
    pub update: Option<UpdateRoute>,
    /// `DELETE` route containing `{id}`.
    pub delete: Option<String>,
    /// `POST` multipart route of bulk imports.
    pub import: Option<String>,
    /// Export prefix; the format is appended as `/csv` or `/pdf`.
    pub export: Option<String>,
    /// Query parameter of the search term.
    pub search_param: SmolStr,
}

impl Endpoints {
    /// Read-only resource listed at `list`.
    pub fn new(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            create: None,
            update: None,
            delete: None,
            import: None,
            export: None,
            search_param: SmolStr::new_static(DEFAULT_SEARCH_PARAM),
        }
    }

    #[must_use]
    pub fn create(mut self, path: impl Into<String>) -> Self {
        self.create = Some(path.into());
        self
    }

    #[must_use]
    pub fn update(mut self, method: UpdateMethod, path: impl Into<String>) -> Self {
        self.update = Some(UpdateRoute {
            method,
            path: path.into(),
        });
        self
    }

    #[must_use]
    pub fn delete(mut self, path: impl Into<String>) -> Self {
        self.delete = Some(path.into());
        self
    }

    #[must_use]
    pub fn import(mut self, path: impl Into<String>) -> Self {
        self.import = Some(path.into());
        self
    }

    #[must_use]
    pub fn export(mut self, path: impl Into<String>) -> Self {
        self.export = Some(path.into());
        self
    }

    #[must_use]
    pub fn search_param(mut self, name: impl Into<SmolStr>) -> Self {
        self.search_param = name.into();
        self
    }

    /// Every configured path, for validation.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.list.as_str())
            .chain(self.create.as_deref())
            .chain(self.update.as_ref().map(|route| route.path.as_str()))
            .chain(self.delete.as_deref())
            .chain(self.import.as_deref())
            .chain(self.export.as_deref())
    }

    /// Method and concrete path performing `kind`.
    pub fn route(&self, resource: &str, kind: &MutationKind) -> Result<(Method, String), FetchError> {
        let missing = || FetchError::Unsupported(format!("{} of {resource}", kind.as_str()));
        match kind {
            MutationKind::Create => {
                let path = self.create.as_ref().ok_or_else(missing)?;
                Ok((Method::POST, path.clone()))
            }
            MutationKind::Update { id } => {
                let route = self.update.as_ref().ok_or_else(missing)?;
                Ok((route.method.into(), with_id(&route.path, id)))
            }
            MutationKind::Delete { id } => {
                let path = self.delete.as_ref().ok_or_else(missing)?;
                Ok((Method::DELETE, with_id(path, id)))
            }
            MutationKind::Import => {
                let path = self.import.as_ref().ok_or_else(missing)?;
                Ok((Method::POST, path.clone()))
            }
        }
    }

    /// Path of the export in `format`.
    pub fn export_path(&self, resource: &str, format: ExportFormat) -> Result<String, FetchError> {
        let prefix = self
            .export
            .as_deref()
            .ok_or_else(|| FetchError::Unsupported(format!("export of {resource}")))?;
        Ok(format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            format.extension()
        ))
    }
}

/// Substitutes `id` for `{id}`, or appends it when the path has no placeholder.
fn with_id(path: &str, id: &str) -> String {
    if path.contains(ID_PLACEHOLDER) {
        path.replace(ID_PLACEHOLDER, id)
    } else {
        format!("{}/{id}", path.trim_end_matches('/'))
    }
}
