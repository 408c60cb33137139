//! Shared state handed to every HTTP handler
//!
//! The state owns one service per concern, all built over the same
//! [`Stores`]. It is transport-agnostic: the REST exposure only reads from
//! it.

use crate::catalog::model::{Garment, School, Size};
use crate::catalog::service::{CatalogService, PriceService};
use crate::config::{OrdersConfig, ShopConfig};
use crate::core::entity::CatalogEntity;
use crate::orders::dashboard::DashboardService;
use crate::orders::service::OrderService;
use crate::storage::Stores;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub schools: CatalogService<School>,
    pub garments: CatalogService<Garment>,
    pub sizes: CatalogService<Size>,
    pub prices: PriceService,
    pub orders: OrderService,
    pub dashboard: DashboardService,
    pub config: Arc<ShopConfig>,
}

impl AppState {
    pub fn new(stores: Stores, config: ShopConfig) -> Self {
        Self {
            schools: CatalogService::new(stores.schools.clone(), stores.catalog.clone()),
            garments: CatalogService::new(stores.garments.clone(), stores.catalog.clone()),
            sizes: CatalogService::new(stores.sizes.clone(), stores.catalog.clone()),
            prices: PriceService::new(stores.clone()),
            orders: OrderService::new(stores.clone(), config.orders.clone()),
            dashboard: DashboardService::new(stores, config.dashboard.clone()),
            config: Arc::new(config),
        }
    }

    /// Listing page sizes
    pub fn orders_config(&self) -> &OrdersConfig {
        &self.config.orders
    }
}

/// Picks the catalog service matching an entity type
///
/// Lets one set of generic handlers serve `/schools`, `/garments` and
/// `/sizes`.
pub trait CatalogResource: CatalogEntity {
    fn service(state: &AppState) -> &CatalogService<Self>;
}

impl CatalogResource for School {
    fn service(state: &AppState) -> &CatalogService<Self> {
        &state.schools
    }
}

impl CatalogResource for Garment {
    fn service(state: &AppState) -> &CatalogService<Self> {
        &state.garments
    }
}

impl CatalogResource for Size {
    fn service(state: &AppState) -> &CatalogService<Self> {
        &state.sizes
    }
}
