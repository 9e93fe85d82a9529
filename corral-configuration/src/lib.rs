//! # corral-configuration
//!
//! YAML configuration of a corral dashboard: where the backend lives, the
//! routes of every resource, cache policies and which resources a write
//! invalidates.
//!
//! Durations use humantime ("500ms", "5m"); policies use the same shape as
//! [`corral::PolicyConfig`].
//!
//! ```
//! use corral_configuration::DashboardConfig;
//!
//! let config = DashboardConfig::from_yaml(r#"
//! api:
//!   base_url: https://api.example.com
//! defaults:
//!   page_size: 20
//!   policy:
//!     Enabled:
//!       stale: 1m
//!       expire: 5m
//! resources:
//!   products:
//!     list: /product/all
//!     delete: /product/{id}
//!     invalidates: [inventory]
//!   inventory:
//!     list: /product/inventories
//!     policy: Disabled
//! "#).unwrap();
//!
//! assert_eq!(config.controller_config("products").page_size, 20);
//! ```

pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod resource;

pub use dashboard::{ApiConfig, DashboardConfig, Defaults};
pub use error::ConfigError;
pub use resource::ResourceConfig;
