//! In-memory storage for tests and development
//!
//! Every table lives behind one `RwLock`, so a write that spans an order and
//! its items is applied under a single guard and is never observed half done.

use crate::catalog::model::{Garment, Price, PriceKey, ReferenceCount, School, Size};
use crate::core::entity::{CatalogRef, Entity};
use crate::core::error::{OrderError, Result, ShopError, StorageError};
use crate::core::query::{OrderFilter, Page};
use crate::core::service::{
    CatalogStore, DataService, OrderStore, OrderTotals, QuantityByRef, RankingDimension,
};
use crate::orders::model::{OrderAggregate, OrderItem, OrderStatus};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    schools: HashMap<Uuid, School>,
    garments: HashMap<Uuid, Garment>,
    sizes: HashMap<Uuid, Size>,
    prices: HashMap<PriceKey, Price>,
    orders: HashMap<Uuid, OrderAggregate>,
}

impl Tables {
    fn items(&self) -> impl Iterator<Item = &OrderItem> {
        self.orders.values().flat_map(|agg| agg.items.iter())
    }
}

/// In-memory backend implementing every storage trait
///
/// Cloning is cheap; clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|e| {
            ShopError::from(StorageError::Transaction {
                message: format!("Failed to acquire read lock: {}", e),
            })
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|e| {
            ShopError::from(StorageError::Transaction {
                message: format!("Failed to acquire write lock: {}", e),
            })
        })
    }
}

fn newest_first(a: &OrderAggregate, b: &OrderAggregate) -> std::cmp::Ordering {
    b.order
        .created_at
        .cmp(&a.order.created_at)
        .then_with(|| b.order.code.cmp(&a.order.code))
}

macro_rules! impl_data_service {
    ($ty:ty, $table:ident) => {
        #[async_trait]
        impl DataService<$ty> for InMemoryStore {
            async fn create(&self, entity: $ty) -> Result<$ty> {
                let mut tables = self.write()?;
                if tables.$table.contains_key(&entity.id) {
                    return Err(StorageError::Conflict {
                        message: format!(
                            "{} '{}' already exists",
                            <$ty>::resource_name_singular(),
                            entity.id
                        ),
                    }
                    .into());
                }
                tables.$table.insert(entity.id, entity.clone());
                Ok(entity)
            }

            async fn get(&self, id: &Uuid) -> Result<Option<$ty>> {
                Ok(self.read()?.$table.get(id).cloned())
            }

            async fn list(&self) -> Result<Vec<$ty>> {
                Ok(self.read()?.$table.values().cloned().collect())
            }

            async fn update(&self, id: &Uuid, entity: $ty) -> Result<$ty> {
                let mut tables = self.write()?;
                let slot = tables.$table.get_mut(id).ok_or_else(|| {
                    ShopError::from(crate::core::error::CatalogError::NotFound {
                        entity_type: <$ty>::resource_name_singular().to_string(),
                        id: *id,
                    })
                })?;
                *slot = entity.clone();
                Ok(entity)
            }

            async fn delete(&self, id: &Uuid) -> Result<bool> {
                Ok(self.write()?.$table.remove(id).is_some())
            }
        }
    };
}

impl_data_service!(School, schools);
impl_data_service!(Garment, garments);
impl_data_service!(Size, sizes);

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_price(&self, key: &PriceKey) -> Result<Option<Price>> {
        Ok(self.read()?.prices.get(key).cloned())
    }

    async fn create_price(&self, price: Price) -> Result<Price> {
        let mut tables = self.write()?;
        let key = price.key();
        if tables.prices.contains_key(&key) {
            return Err(StorageError::Conflict {
                message: "price triple already exists".to_string(),
            }
            .into());
        }
        tables.prices.insert(key, price.clone());
        Ok(price)
    }

    async fn update_price(&self, key: &PriceKey, amount: i64) -> Result<Option<Price>> {
        let mut tables = self.write()?;
        Ok(tables.prices.get_mut(key).map(|price| {
            price.price = amount;
            price.clone()
        }))
    }

    async fn delete_price(&self, key: &PriceKey) -> Result<bool> {
        Ok(self.write()?.prices.remove(key).is_some())
    }

    async fn list_prices(&self) -> Result<Vec<Price>> {
        Ok(self.read()?.prices.values().cloned().collect())
    }

    async fn count_references(&self, target: CatalogRef) -> Result<ReferenceCount> {
        let tables = self.read()?;
        let items = tables.items().filter(|item| item.references(target)).count() as u64;
        let prices = tables
            .prices
            .keys()
            .filter(|key| key.references(target))
            .count() as u64;
        Ok(ReferenceCount { prices, items })
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get_order(&self, id: &Uuid) -> Result<Option<OrderAggregate>> {
        Ok(self.read()?.orders.get(id).cloned())
    }

    async fn get_item(&self, item_id: &Uuid) -> Result<Option<OrderItem>> {
        Ok(self
            .read()?
            .items()
            .find(|item| item.id == *item_id)
            .cloned())
    }

    async fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .orders
            .values()
            .filter(|agg| agg.order.code.starts_with(prefix))
            .map(|agg| agg.order.code.clone())
            .collect())
    }

    async fn insert_order(&self, aggregate: &OrderAggregate) -> Result<()> {
        let mut tables = self.write()?;
        let taken = tables
            .orders
            .values()
            .any(|existing| existing.order.code == aggregate.order.code);
        if taken || tables.orders.contains_key(&aggregate.id()) {
            return Err(StorageError::Conflict {
                message: format!("order code '{}' already exists", aggregate.order.code),
            }
            .into());
        }
        tables.orders.insert(aggregate.id(), aggregate.clone());
        Ok(())
    }

    async fn save_order(&self, aggregate: &OrderAggregate, expected_version: i64) -> Result<()> {
        let mut tables = self.write()?;
        let slot = tables
            .orders
            .get_mut(&aggregate.id())
            .ok_or_else(|| ShopError::from(OrderError::order_not_found(aggregate.id())))?;
        if slot.order.version != expected_version {
            return Err(StorageError::Conflict {
                message: format!(
                    "order '{}' is at version {}, not {expected_version}",
                    slot.order.code, slot.order.version
                ),
            }
            .into());
        }
        // items absent from the aggregate are the removed ones
        *slot = aggregate.clone();
        Ok(())
    }

    async fn delete_order(&self, id: &Uuid) -> Result<bool> {
        Ok(self.write()?.orders.remove(id).is_some())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderAggregate>> {
        let tables = self.read()?;
        let mut matching: Vec<&OrderAggregate> = tables
            .orders
            .values()
            .filter(|agg| filter.status.is_none_or(|status| agg.order.status == status))
            .filter(|agg| filter.year.is_none_or(|year| agg.order.year == year))
            .filter(|agg| {
                filter.matches_search(
                    &agg.order.client.client_name,
                    agg.order.client.client_surname.as_deref(),
                )
            })
            .collect();
        matching.sort_by(|a, b| newest_first(a, b));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn order_totals(&self) -> Result<OrderTotals> {
        let tables = self.read()?;
        let mut totals = OrderTotals::default();
        for agg in tables.orders.values() {
            let order = &agg.order;
            totals.total_orders += 1;
            match order.status {
                OrderStatus::Ingresado => totals.ingresado += 1,
                OrderStatus::EnProceso => totals.en_proceso += 1,
                OrderStatus::Entregado => totals.entregado += 1,
            }
            totals.total_sales = totals.total_sales.saturating_add(order.total);
            totals.outstanding_balance = totals.outstanding_balance.saturating_add(order.saldo);
        }
        Ok(totals)
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<OrderAggregate>> {
        let tables = self.read()?;
        let mut orders: Vec<&OrderAggregate> = tables.orders.values().collect();
        orders.sort_by(|a, b| newest_first(a, b));
        Ok(orders.into_iter().take(limit).cloned().collect())
    }

    async fn quantity_ranking(
        &self,
        by: RankingDimension,
        limit: usize,
    ) -> Result<Vec<QuantityByRef>> {
        let tables = self.read()?;
        let mut sums: HashMap<Uuid, i64> = HashMap::new();
        for item in tables.items() {
            let id = match by {
                RankingDimension::Garment => item.garment_id,
                RankingDimension::School => item.school_id,
            };
            let sum = sums.entry(id).or_default();
            *sum = sum.saturating_add(item.quantity);
        }

        let mut ranking: Vec<QuantityByRef> = sums
            .into_iter()
            .map(|(id, quantity)| QuantityByRef { id, quantity })
            .collect();
        ranking.sort_by_key(|entry| (Reverse(entry.quantity), entry.id));
        ranking.truncate(limit);
        Ok(ranking)
    }
}
