//! Service traits for catalog and order persistence
//!
//! The domain services never talk to a database directly. They depend on the
//! traits below, which every storage backend implements. Writes that touch
//! more than one row (an order and its items) go through a single call so the
//! backend can make them all-or-nothing.

use crate::catalog::model::{Garment, Price, PriceKey, ReferenceCount, School, Size};
use crate::core::entity::{CatalogEntity, CatalogRef};
use crate::core::error::Result;
use crate::core::query::{OrderFilter, Page};
use crate::orders::model::{OrderAggregate, OrderItem, OrderStatus};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Service trait for managing catalog entities
///
/// Implementations provide CRUD operations for a specific entity type.
/// The services are agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: CatalogEntity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: T) -> Result<T>;

    /// Get an entity by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// List all entities
    async fn list(&self) -> Result<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, id: &Uuid, entity: T) -> Result<T>;

    /// Delete an entity, returning whether it existed
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

/// Price table and referential bookkeeping for the catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up the price for a (school, garment, size) triple
    async fn find_price(&self, key: &PriceKey) -> Result<Option<Price>>;

    /// Insert a price; a second price for the same triple is rejected
    async fn create_price(&self, price: Price) -> Result<Price>;

    /// Replace the amount of an existing price
    async fn update_price(&self, key: &PriceKey, amount: i64) -> Result<Option<Price>>;

    /// Delete a price, returning whether it existed
    async fn delete_price(&self, key: &PriceKey) -> Result<bool>;

    /// List every price
    async fn list_prices(&self) -> Result<Vec<Price>>;

    /// Count prices and order items pointing at a catalog entity
    async fn count_references(&self, target: CatalogRef) -> Result<ReferenceCount>;
}

/// Per-status order counts and money sums
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub total_orders: u64,
    pub ingresado: u64,
    pub en_proceso: u64,
    pub entregado: u64,
    pub total_sales: i64,
    pub outstanding_balance: i64,
}

impl OrderTotals {
    pub fn count_for(&self, status: OrderStatus) -> u64 {
        match status {
            OrderStatus::Ingresado => self.ingresado,
            OrderStatus::EnProceso => self.en_proceso,
            OrderStatus::Entregado => self.entregado,
        }
    }
}

/// Ordered quantity summed per catalog entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityByRef {
    pub id: Uuid,
    pub quantity: i64,
}

/// Persistence for the order aggregate
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load an order together with its items
    async fn get_order(&self, id: &Uuid) -> Result<Option<OrderAggregate>>;

    /// Find an item by id
    async fn get_item(&self, item_id: &Uuid) -> Result<Option<OrderItem>>;

    /// All codes starting with `prefix` (e.g. "PED-2025-")
    async fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Insert a new order and all its items atomically.
    ///
    /// Fails with `StorageError::Conflict` when the order code is taken.
    async fn insert_order(&self, aggregate: &OrderAggregate) -> Result<()>;

    /// Replace a stored aggregate atomically: the order row, every item in
    /// `aggregate.items` (inserted or updated) and the removal of the items
    /// it no longer holds.
    ///
    /// The write only happens while the stored order is still at
    /// `expected_version`; otherwise it fails with `StorageError::Conflict`
    /// and nothing changes.
    async fn save_order(&self, aggregate: &OrderAggregate, expected_version: i64) -> Result<()>;

    /// Delete an order and its items, returning whether it existed
    async fn delete_order(&self, id: &Uuid) -> Result<bool>;

    /// Filtered, paginated listing, newest first
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderAggregate>>;

    /// Counts and sums over every order
    async fn order_totals(&self) -> Result<OrderTotals>;

    /// Most recently created orders
    async fn recent_orders(&self, limit: usize) -> Result<Vec<OrderAggregate>>;

    /// Ordered quantity per garment or per school, highest first
    async fn quantity_ranking(&self, by: RankingDimension, limit: usize)
    -> Result<Vec<QuantityByRef>>;
}

/// Dimension used by [`OrderStore::quantity_ranking`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingDimension {
    Garment,
    School,
}

/// A backend that serves every table of the application
pub trait ShopBackend:
    DataService<School> + DataService<Garment> + DataService<Size> + CatalogStore + OrderStore + 'static
{
}

impl<B> ShopBackend for B where
    B: DataService<School>
        + DataService<Garment>
        + DataService<Size>
        + CatalogStore
        + OrderStore
        + 'static
{
}
