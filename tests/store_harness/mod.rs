//! Shared test harness for storage backend testing
//!
//! Provides a [`Shop`] bundling every service over one set of [`Stores`],
//! a small fixed catalog and helpers for building order payloads. The
//! `catalog_service_tests!` and `order_service_tests!` macros run the same
//! contract suite against any backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//! use store_harness::*;
//!
//! order_service_tests!(Stores::in_memory());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod order_tests;

use uniform_orders::catalog::model::{
    Garment, GarmentInput, PriceInput, School, SchoolInput, Size, SizeInput,
};
use uniform_orders::catalog::service::{CatalogService, PriceService};
use uniform_orders::config::{DashboardConfig, OrdersConfig};
use uniform_orders::core::error::ShopError;
use uniform_orders::orders::dashboard::DashboardService;
use uniform_orders::orders::input::{ClientInfoInput, DraftItem, NewOrder};
use uniform_orders::orders::model::{ClientInfo, OrderAggregate, OrderStatus};
use uniform_orders::orders::service::OrderService;
use uniform_orders::storage::Stores;
use uuid::Uuid;

/// Year every harness order is recorded under
pub const YEAR: i32 = 2025;

pub const SHIRT_M: i64 = 12000;
pub const SHIRT_L: i64 = 13000;
pub const PANTS_M: i64 = 18000;
pub const COLEGIO_SHIRT_M: i64 = 11000;

/// Every service built over the same stores
#[derive(Clone)]
pub struct Shop {
    pub stores: Stores,
    pub schools: CatalogService<School>,
    pub garments: CatalogService<Garment>,
    pub sizes: CatalogService<Size>,
    pub prices: PriceService,
    pub orders: OrderService,
    pub dashboard: DashboardService,
}

impl Shop {
    pub fn new(stores: Stores) -> Self {
        Self {
            schools: CatalogService::new(stores.schools.clone(), stores.catalog.clone()),
            garments: CatalogService::new(stores.garments.clone(), stores.catalog.clone()),
            sizes: CatalogService::new(stores.sizes.clone(), stores.catalog.clone()),
            prices: PriceService::new(stores.clone()),
            orders: OrderService::new(stores.clone(), OrdersConfig::default()),
            dashboard: DashboardService::new(stores.clone(), DashboardConfig::default()),
            stores,
        }
    }
}

/// Ids of the fixed test catalog
///
/// Prices: Liceo X shirt M 12000, shirt L 13000, pants M 18000;
/// Colegio Norte shirt M 11000. Pants L has no price anywhere.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub liceo: Uuid,
    pub colegio: Uuid,
    pub shirt: Uuid,
    pub pants: Uuid,
    pub size_m: Uuid,
    pub size_l: Uuid,
}

impl Catalog {
    pub fn shirt_m(&self, quantity: i64) -> DraftItem {
        line(self.liceo, self.shirt, self.size_m, quantity)
    }

    pub fn shirt_l(&self, quantity: i64) -> DraftItem {
        line(self.liceo, self.shirt, self.size_l, quantity)
    }

    pub fn pants_m(&self, quantity: i64) -> DraftItem {
        line(self.liceo, self.pants, self.size_m, quantity)
    }

    pub fn colegio_shirt_m(&self, quantity: i64) -> DraftItem {
        line(self.colegio, self.shirt, self.size_m, quantity)
    }

    /// A product without a catalog price
    pub fn pants_l(&self, quantity: i64) -> DraftItem {
        line(self.liceo, self.pants, self.size_l, quantity)
    }
}

pub async fn seed_catalog(shop: &Shop) -> Catalog {
    let liceo = shop.schools.create(school("Liceo X")).await.unwrap().id;
    let colegio = shop.schools.create(school("Colegio Norte")).await.unwrap().id;
    let shirt = shop.garments.create(garment("Camisa")).await.unwrap().id;
    let pants = shop.garments.create(garment("Pantalón")).await.unwrap().id;
    let size_m = shop.sizes.create(size("M", 3)).await.unwrap().id;
    let size_l = shop.sizes.create(size("L", 4)).await.unwrap().id;

    for (school_id, garment_id, size_id, price) in [
        (liceo, shirt, size_m, SHIRT_M),
        (liceo, shirt, size_l, SHIRT_L),
        (liceo, pants, size_m, PANTS_M),
        (colegio, shirt, size_m, COLEGIO_SHIRT_M),
    ] {
        shop.prices
            .create_price(PriceInput {
                school_id,
                garment_id,
                size_id,
                price,
            })
            .await
            .unwrap();
    }

    Catalog {
        liceo,
        colegio,
        shirt,
        pants,
        size_m,
        size_l,
    }
}

pub fn school(name: &str) -> SchoolInput {
    SchoolInput {
        name: name.to_string(),
        active: true,
    }
}

pub fn garment(name: &str) -> GarmentInput {
    GarmentInput {
        name: name.to_string(),
        description: None,
        active: true,
    }
}

pub fn size(name: &str, display_order: i32) -> SizeInput {
    SizeInput {
        name: name.to_string(),
        display_order,
        active: true,
    }
}

pub fn line(school_id: Uuid, garment_id: Uuid, size_id: Uuid, quantity: i64) -> DraftItem {
    DraftItem {
        school_id,
        garment_id,
        size_id,
        quantity,
    }
}

pub fn client(name: &str, surname: &str) -> ClientInfoInput {
    ClientInfoInput {
        client_name: name.to_string(),
        client_surname: Some(surname.to_string()),
        ..Default::default()
    }
}

pub fn new_order(items: Vec<DraftItem>) -> NewOrder {
    NewOrder::new(client("Ana", "Pérez"), YEAR, items)
}

/// Order content without timestamps
///
/// Backends may store timestamps at a lower precision than `Utc::now()`,
/// so comparisons across a round-trip go through this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    pub id: Uuid,
    pub code: String,
    pub client: ClientInfo,
    pub year: i32,
    pub status: OrderStatus,
    pub total: i64,
    pub abono: i64,
    pub saldo: i64,
    pub discounted_total: Option<i64>,
    /// (id, product, quantity, unit price, subtotal, ready)
    pub items: Vec<(Uuid, (Uuid, Uuid, Uuid), i64, i64, i64, bool)>,
}

pub fn order_state(aggregate: &OrderAggregate) -> OrderState {
    let order = &aggregate.order;
    OrderState {
        id: order.id,
        code: order.code.clone(),
        client: order.client.clone(),
        year: order.year,
        status: order.status,
        total: order.total,
        abono: order.abono,
        saldo: order.saldo,
        discounted_total: order.discounted_total,
        items: aggregate
            .items
            .iter()
            .map(|item| {
                (
                    item.id,
                    (item.school_id, item.garment_id, item.size_id),
                    item.quantity,
                    item.unit_price,
                    item.subtotal,
                    item.ready,
                )
            })
            .collect(),
    }
}

/// Machine code of a failed call
pub fn code_of<T: std::fmt::Debug>(result: Result<T, ShopError>) -> &'static str {
    result.unwrap_err().error_code()
}
