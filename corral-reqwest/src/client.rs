//! HTTP client speaking the dashboard REST contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use corral_core::{
    CollectionLoader, FetchError, FormPart, ListEnvelope, Mutation, MutationResponse,
    MutationTransport, Page, PartValue, Payload, QueryKey, Sortable,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::endpoints::{Endpoints, ExportFormat};
use crate::error::{ClientError, send_error, status_error};

/// Query parameter naming the sort column.
pub const SORT_BY_PARAM: &str = "sortBy";

/// Query parameter carrying the sort direction.
pub const SORT_ORDER_PARAM: &str = "sortOrder";

/// A downloaded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Suggested file name, `{resource}_list.{ext}`.
    pub file_name: String,
    /// Content type reported by the backend.
    pub content_type: String,
    /// File content.
    pub bytes: Bytes,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

struct ClientInner {
    http: Client,
    base_url: String,
    token: Option<String>,
    routes: HashMap<SmolStr, Endpoints>,
}

/// REST client of the dashboard backend.
///
/// Knows the routes of every registered resource and implements both
/// [`CollectionLoader`] (for any deserializable row type) and
/// [`MutationTransport`]. Cloning is cheap.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url)
            .field("resources", &self.inner.routes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder of [`RestClient`].
#[derive(Debug)]
pub struct RestClientBuilder {
    base_url: String,
    token: Option<String>,
    timeout: Option<Duration>,
    http: Option<Client>,
    routes: HashMap<SmolStr, Endpoints>,
}

impl RestClientBuilder {
    /// Sends `Authorization: Bearer {token}` with every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request timeout; an elapsed request fails with
    /// [`FetchError::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses a preconfigured HTTP client. [`timeout`](Self::timeout) is then
    /// ignored.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Registers the routes of `resource`.
    pub fn resource(mut self, resource: impl Into<SmolStr>, endpoints: Endpoints) -> Self {
        self.routes.insert(resource.into(), endpoints);
        self
    }

    /// Registers several resources.
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = (S, Endpoints)>,
        S: Into<SmolStr>,
    {
        self.routes
            .extend(resources.into_iter().map(|(name, endpoints)| (name.into(), endpoints)));
        self
    }

    /// Validates the routes and builds the client.
    pub fn build(self) -> Result<RestClient, ClientError> {
        let base_url = self.base_url.trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(self.base_url));
        }
        for (resource, endpoints) in &self.routes {
            if let Some(path) = endpoints.paths().find(|path| !path.starts_with('/')) {
                return Err(ClientError::InvalidRoute {
                    resource: resource.clone(),
                    path: path.to_owned(),
                });
            }
        }

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(RestClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                token: self.token,
                routes: self.routes,
            }),
        })
    }
}

impl RestClient {
    /// Starts a client for the API rooted at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder {
            base_url: base_url.into(),
            token: None,
            timeout: None,
            http: None,
            routes: HashMap::new(),
        }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Routes of `resource`.
    pub fn endpoints(&self, resource: &str) -> Result<&Endpoints, FetchError> {
        self.inner
            .routes
            .get(resource)
            .ok_or_else(|| FetchError::Unsupported(format!("unknown resource {resource}")))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        let mut request = self.inner.http.request(method, url);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Sends `request`; returns the body of a 2xx reply.
    async fn send(&self, request: RequestBuilder) -> Result<(Option<String>, Bytes), FetchError> {
        let response = request.send().await.map_err(send_error)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(send_error)?;
        if !status.is_success() {
            let err = status_error(status, &body);
            warn!(%status, error = %err, "backend rejected request");
            return Err(err);
        }
        Ok((content_type, body))
    }

    /// Query string of `key`: `page`, `limit`, then `sortBy`/`sortOrder` and
    /// the non-empty filters.
    pub fn list_query(key: &QueryKey) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_owned(), key.page().to_string()),
            ("limit".to_owned(), key.limit().to_string()),
        ];
        if let Some(sort) = key.sort() {
            query.push((SORT_BY_PARAM.to_owned(), sort.field.to_string()));
            query.push((SORT_ORDER_PARAM.to_owned(), sort.direction.as_str().to_owned()));
        }
        query.extend(
            key.filters()
                .map(|(name, value)| (name.to_owned(), value.to_owned())),
        );
        query
    }

    /// Fetches the page identified by `key` from the list route of its
    /// resource.
    pub async fn list<T>(&self, key: &QueryKey) -> Result<Page<T>, FetchError>
    where
        T: DeserializeOwned + Sortable,
    {
        let endpoints = self.endpoints(key.resource())?;
        debug!(%key, path = %endpoints.list, "fetching page");
        let request = self
            .request(Method::GET, &endpoints.list)
            .query(&Self::list_query(key));
        let (_, body) = self.send(request).await?;
        let envelope: ListEnvelope<T> = decode(&body)?;
        Ok(envelope.into_page(key))
    }

    /// Fetches the `data` of a non-paginated resource such as an overview.
    pub async fn fetch_one<T>(&self, resource: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let endpoints = self.endpoints(resource)?;
        let (_, body) = self.send(self.request(Method::GET, &endpoints.list)).await?;
        let envelope: DataEnvelope<T> = decode(&body)?;
        Ok(envelope.data)
    }

    /// Performs `mutation` on the route its kind maps to.
    ///
    /// An empty 2xx body counts as an accepted mutation.
    pub async fn execute(&self, mutation: &Mutation) -> Result<MutationResponse, FetchError> {
        let endpoints = self.endpoints(&mutation.resource)?;
        let (method, path) = endpoints.route(&mutation.resource, &mutation.kind)?;
        debug!(resource = %mutation.resource, kind = mutation.kind.as_str(), %method, %path, "sending mutation");

        let request = with_payload(self.request(method, &path), &mutation.payload)?;
        let (_, body) = self.send(request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(MutationResponse {
                success: true,
                message: String::new(),
                data: None,
            });
        }
        decode(&body)
    }

    /// Downloads the `format` export of `resource`, filtered by `search`.
    pub async fn export(
        &self,
        resource: &str,
        format: ExportFormat,
        search: &str,
    ) -> Result<ExportFile, FetchError> {
        let endpoints = self.endpoints(resource)?;
        let path = endpoints.export_path(resource, format)?;
        let request = self
            .request(Method::GET, &path)
            .query(&[("search", search)]);
        let (content_type, bytes) = self.send(request).await?;
        debug!(resource, format = format.extension(), size = bytes.len(), "export downloaded");
        Ok(ExportFile {
            file_name: format!("{resource}_list.{}", format.extension()),
            content_type: content_type.unwrap_or_else(|| format.content_type().to_owned()),
            bytes,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|err| FetchError::Decode(err.to_string()))
}

fn with_payload(request: RequestBuilder, payload: &Payload) -> Result<RequestBuilder, FetchError> {
    Ok(match payload {
        Payload::Empty => request,
        Payload::Json(value) => request.json(value),
        Payload::Form(fields) => request.form(fields),
        Payload::Multipart(parts) => request.multipart(multipart(parts)?),
    })
}

fn multipart(parts: &[FormPart]) -> Result<Form, FetchError> {
    parts.iter().try_fold(Form::new(), |form, part| {
        let name = part.name.clone();
        Ok(match &part.value {
            PartValue::Text(text) => form.text(name, text.clone()),
            PartValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let file = Part::bytes(bytes.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|err| {
                        FetchError::Unsupported(format!("content type {content_type}: {err}"))
                    })?;
                form.part(name, file)
            }
        })
    })
}

#[async_trait]
impl<T> CollectionLoader<T> for RestClient
where
    T: DeserializeOwned + Sortable + Send + 'static,
{
    async fn load(&self, key: &QueryKey) -> Result<Page<T>, FetchError> {
        self.list(key).await
    }
}

#[async_trait]
impl MutationTransport for RestClient {
    async fn execute(&self, mutation: &Mutation) -> Result<MutationResponse, FetchError> {
        RestClient::execute(self, mutation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::SortSpec;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_carries_sort_and_filters() {
        let key = QueryKey::new("orders", 3, 25)
            .unwrap()
            .with_sort(SortSpec::desc("createdAt"))
            .with_filter("searchTerm", "ann")
            .with_filter("region", "");
        let query = RestClient::list_query(&key);
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("page", "3"),
                ("limit", "25"),
                ("sortBy", "createdAt"),
                ("sortOrder", "desc"),
                ("searchTerm", "ann"),
            ]
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = RestClient::builder("api.example.com").build().unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn route_without_leading_slash_is_rejected() {
        let err = RestClient::builder("https://api.example.com/")
            .resource("products", Endpoints::new("product/all"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRoute { path, .. } if path == "product/all"));
    }
}
