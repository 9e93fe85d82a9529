use std::sync::Arc;

use corral::{
    CollectionController, ControllerConfig, MutationError, MutationGateway, QueryCache,
};
use corral_configuration::DashboardConfig;
use corral_configuration::catalog::{ANALYTICS, CATEGORIES, INVENTORY, ORDERS, PRODUCTS, USERS};
use corral_core::{
    CollectionLoader, Mutation, MutationKind, MutationResult, Payload, QueryKey, Sortable,
};
use corral_reqwest::{ExportFile, ExportFormat, RestClient};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use validator::Validate;

use crate::error::AdminError;
use crate::forms::{
    AddUser, BalanceUpdate, CreateProduct, NewCategory, UpdateProduct, UpdateUser, Upload,
};
use crate::model::{Analytics, Category, InventoryItem, Order, Product, User};

/// Filter narrowing inventory and orders to one regional office.
pub const REGION_FILTER: &str = "region";

/// Multipart field of the employee CSV import.
pub const IMPORT_FIELD: &str = "file";

/// Aborts the cache janitor once the last dashboard clone is gone.
#[derive(Debug)]
struct Janitor(JoinHandle<()>);

impl Drop for Janitor {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The retail dashboard: typed collections and writes over one shared cache.
///
/// Every controller created here reads through the same [`QueryCache`], and
/// every write goes through one [`MutationGateway`], so a write is reflected
/// in every open list of the resources it affects.
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: Arc<DashboardConfig>,
    client: RestClient,
    cache: QueryCache,
    gateway: MutationGateway,
    _janitor: Arc<Janitor>,
}

impl Dashboard {
    /// Builds a dashboard from `config`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(config: DashboardConfig) -> Result<Self, AdminError> {
        config.validate()?;
        let client = config.rest_client()?;
        let cache = QueryCache::new(config.cache_config());
        let gateway = config.register_dependents(MutationGateway::new(
            cache.clone(),
            Arc::new(client.clone()),
        ));
        let janitor_period = config.janitor_period();
        let janitor = Janitor(cache.spawn_janitor(janitor_period));
        info!(
            base_url = client.base_url(),
            resources = config.resources.len(),
            janitor_ms = janitor_period.as_millis() as u64,
            "dashboard ready"
        );
        Ok(Self {
            config: Arc::new(config),
            client,
            cache,
            gateway,
            _janitor: Arc::new(janitor),
        })
    }

    /// The built-in retail resources served from `base_url`.
    pub fn builtin(base_url: impl Into<String>) -> Result<Self, AdminError> {
        Self::new(DashboardConfig::builtin(base_url))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    /// A controller over `resource` with the configured settings.
    pub fn collection<T>(&self, resource: &str) -> Result<CollectionController<T>, AdminError>
    where
        T: DeserializeOwned + Sortable + Send + Sync + 'static,
    {
        self.collection_with(resource, self.config.controller_config(resource))
    }

    fn collection_with<T>(
        &self,
        resource: &str,
        config: ControllerConfig,
    ) -> Result<CollectionController<T>, AdminError>
    where
        T: DeserializeOwned + Sortable + Send + Sync + 'static,
    {
        let loader: Arc<dyn CollectionLoader<T>> = Arc::new(self.client.clone());
        debug!(resource, page_size = config.page_size, "opening collection");
        Ok(CollectionController::new(
            resource,
            self.cache.clone(),
            loader,
            config,
        )?)
    }

    pub fn products(&self) -> Result<CollectionController<Product>, AdminError> {
        self.collection(PRODUCTS)
    }

    pub fn users(&self) -> Result<CollectionController<User>, AdminError> {
        self.collection(USERS)
    }

    /// Stock of the office in `region`.
    pub fn inventory(&self, region: &str) -> Result<CollectionController<InventoryItem>, AdminError> {
        let config = self.config.controller_config(INVENTORY).filter(REGION_FILTER, region);
        self.collection_with(INVENTORY, config)
    }

    /// Orders of every office, or of `region` only.
    pub fn orders(&self, region: Option<&str>) -> Result<CollectionController<Order>, AdminError> {
        let config = self.config.controller_config(ORDERS);
        let config = match region {
            Some(region) => config.filter(REGION_FILTER, region),
            None => config,
        };
        self.collection_with(ORDERS, config)
    }

    pub fn categories(&self) -> Result<CollectionController<Category>, AdminError> {
        self.collection(CATEGORIES)
    }

    /// Headline figures, cached like any other query.
    pub async fn analytics(&self) -> Result<Arc<Analytics>, AdminError> {
        let key = QueryKey::singleton(ANALYTICS)?;
        let client = self.client.clone();
        let analytics = self
            .cache
            .fetch(&key, move || async move {
                client.fetch_one::<Analytics>(ANALYTICS).await
            })
            .await?;
        Ok(analytics)
    }

    pub async fn add_product(&self, form: &CreateProduct) -> Result<MutationResult, MutationError> {
        form.validate()?;
        let payload = Payload::Multipart(form.to_multipart());
        self.gateway.mutate(Mutation::create(PRODUCTS, payload)).await
    }

    pub async fn edit_product(
        &self,
        id: &str,
        form: &UpdateProduct,
    ) -> Result<MutationResult, MutationError> {
        self.gateway
            .mutate_validated(PRODUCTS, MutationKind::Update { id: id.into() }, form)
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<MutationResult, MutationError> {
        self.gateway.mutate(Mutation::delete(PRODUCTS, id)).await
    }

    pub async fn add_user(&self, form: &AddUser) -> Result<MutationResult, MutationError> {
        self.gateway
            .mutate_validated(USERS, MutationKind::Create, form)
            .await
    }

    pub async fn edit_user(
        &self,
        id: &str,
        form: &UpdateUser,
    ) -> Result<MutationResult, MutationError> {
        self.gateway
            .mutate_validated(USERS, MutationKind::Update { id: id.into() }, form)
            .await
    }

    /// Sets the spending allowance of one employee.
    pub async fn update_user_balance(
        &self,
        id: &str,
        balance: f64,
    ) -> Result<MutationResult, MutationError> {
        self.gateway
            .mutate_validated(
                USERS,
                MutationKind::Update { id: id.into() },
                &BalanceUpdate { balance },
            )
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<MutationResult, MutationError> {
        self.gateway.mutate(Mutation::delete(USERS, id)).await
    }

    /// Registers employees in bulk from a CSV file.
    ///
    /// Per-row outcomes are in [`MutationResult::import_summary`].
    pub async fn import_users(&self, file: &Upload) -> Result<MutationResult, MutationError> {
        let payload = Payload::Multipart(vec![file.part(IMPORT_FIELD)]);
        self.gateway
            .mutate(Mutation::new(USERS, MutationKind::Import, payload))
            .await
    }

    pub async fn add_category(&self, form: &NewCategory) -> Result<MutationResult, MutationError> {
        form.validate()?;
        let payload = Payload::Multipart(form.to_multipart());
        self.gateway.mutate(Mutation::create(CATEGORIES, payload)).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<MutationResult, MutationError> {
        self.gateway.mutate(Mutation::delete(CATEGORIES, id)).await
    }

    pub async fn delete_order(&self, id: &str) -> Result<MutationResult, MutationError> {
        self.gateway.mutate(Mutation::delete(ORDERS, id)).await
    }

    /// Downloads `resource` as a file, filtered like its list by `search`.
    pub async fn export(
        &self,
        resource: &str,
        format: ExportFormat,
        search: &str,
    ) -> Result<ExportFile, AdminError> {
        Ok(self.client.export(resource, format, search).await?)
    }
}
