//! # corral-reqwest
//!
//! REST transport for corral over [`reqwest`].
//!
//! [`RestClient`] knows the [`Endpoints`] of every resource of the backend
//! and speaks its uniform contract:
//!
//! - `GET {list}?page&limit[&sortBy&sortOrder][&filters]`, accepting the
//!   `meta`, `pagination`, echoed `page`/`limit` and bare `data` list shapes
//! - `POST {create}`, `PUT|PATCH {update}`, `DELETE {delete}` and multipart
//!   `POST {import}`, each answering `{ success, message, data? }`
//! - `GET {export}/csv|pdf?search=` returning a file
//!
//! Non-2xx replies become [`FetchError::Status`](corral_core::FetchError::Status)
//! carrying the `message` of the body.
//!
//! ```no_run
//! use corral::{CollectionController, ControllerConfig, QueryCache};
//! use corral_reqwest::{Endpoints, RestClient, UpdateMethod};
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::builder("https://api.example.com")
//!     .bearer_token("secret")
//!     .resource(
//!         "products",
//!         Endpoints::new("/product/all")
//!             .create("/product/create")
//!             .update(UpdateMethod::Put, "/product/{id}")
//!             .delete("/product/{id}"),
//!     )
//!     .build()?;
//!
//! let cache = QueryCache::default();
//! let products: CollectionController<Value> = CollectionController::new(
//!     "products",
//!     cache,
//!     Arc::new(client),
//!     ControllerConfig::default(),
//! )?;
//! products.load().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod endpoints;
mod error;

pub use client::{ExportFile, RestClient, RestClientBuilder, SORT_BY_PARAM, SORT_ORDER_PARAM};
pub use endpoints::{
    DEFAULT_SEARCH_PARAM, Endpoints, ExportFormat, ID_PLACEHOLDER, UpdateMethod, UpdateRoute,
};
pub use error::ClientError;

/// Re-export of the HTTP client type for [`RestClientBuilder::http_client`].
pub use reqwest::Client as ReqwestClient;
