//! # corral-admin
//!
//! The retail dashboard on top of corral: typed records, validated input
//! forms and a [`Dashboard`] facade wiring the REST client, the shared query
//! cache and the mutation gateway together.
//!
//! ```no_run
//! use corral_admin::Dashboard;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let dashboard = Dashboard::builtin("https://api.example.com")?;
//!
//! let products = dashboard.products()?;
//! products.load().await;
//! products.on_search_input("boots");
//!
//! if let Err(err) = dashboard.delete_product("p1").await {
//!     eprintln!("{}", err.user_message());
//! }
//! # Ok(())
//! # }
//! ```

pub mod dashboard;
pub mod error;
pub mod forms;
pub mod model;

pub use dashboard::Dashboard;
pub use error::AdminError;
pub use forms::{
    AddUser, BalanceUpdate, CreateProduct, NewCategory, UpdateProduct, UpdateUser, Upload,
};
