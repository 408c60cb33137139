//! Order operations
//!
//! Every mutation follows the same path: load the aggregate, check that the
//! order is still open, change it in memory, re-derive totals and status,
//! then persist it with one atomic store call made against the version that
//! was read. A rejected change never leaves a partial write behind, and a
//! save that raced another one is redone on a fresh read.

use crate::catalog::service::PriceService;
use crate::config::OrdersConfig;
use crate::core::error::{OrderError, Result, ShopError, StorageError};
use crate::core::query::{OrderFilter, Page};
use crate::core::validation::validate;
use crate::orders::code::OrderCode;
use crate::orders::draft::{OrderDraft, merge_draft_items};
use crate::orders::input::{ClientInfoInput, DraftItem, NewOrder};
use crate::orders::model::{Order, OrderAggregate, OrderItem, OrderStatus};
use crate::orders::pricing;
use crate::orders::status::{self, Transition};
use crate::storage::Stores;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Attempts at allocating a fresh code when a concurrent insert took ours
const MAX_CODE_ATTEMPTS: usize = 5;

/// Attempts at saving an order that keeps being changed concurrently
const MAX_SAVE_ATTEMPTS: usize = 10;

/// What an order change decided
enum Edit {
    Save,
    Unchanged,
}

/// A line item together with its order after the change
#[derive(Debug, Clone, Serialize)]
pub struct ItemUpdate {
    pub item: OrderItem,
    pub order: OrderAggregate,
}

impl ItemUpdate {
    fn from_aggregate(order: OrderAggregate, item_id: Uuid) -> Result<Self> {
        let item = order
            .item(item_id)
            .cloned()
            .ok_or_else(|| ShopError::from(OrderError::item_not_found(item_id)))?;
        Ok(Self { item, order })
    }
}

#[derive(Clone)]
pub struct OrderService {
    stores: Stores,
    prices: PriceService,
    config: OrdersConfig,
}

impl OrderService {
    pub fn new(stores: Stores, config: OrdersConfig) -> Self {
        Self {
            prices: PriceService::new(stores.clone()),
            stores,
            config,
        }
    }

    /// Create an order with its items, priced from the catalog.
    ///
    /// Nothing is written unless every item has a price and the payment
    /// fits the resulting total.
    pub async fn create_order(&self, input: NewOrder) -> Result<OrderAggregate> {
        validate(&input)?;
        let NewOrder {
            client,
            year,
            delivery_date,
            items,
            abono,
        } = input;
        let client = client.into_client_info()?;

        if items.is_empty() {
            tracing::warn!(client = %client.client_name, "order without items rejected");
            return Err(OrderError::EmptyOrder.into());
        }

        let order = Order::new(client, year, delivery_date);
        let mut lines = Vec::with_capacity(items.len());
        for line in merge_draft_items(&items)? {
            lines.push(self.price_line(order.id, &line).await?);
        }

        let mut aggregate = OrderAggregate::new(order, lines);
        pricing::recompute_totals(&mut aggregate)?;
        pricing::apply_payment(&mut aggregate.order, abono)?;

        self.insert_with_fresh_code(&mut aggregate).await?;
        tracing::info!(
            order_id = %aggregate.id(),
            code = %aggregate.order.code,
            items = aggregate.items.len(),
            total = aggregate.order.total,
            saldo = aggregate.order.saldo,
            "order created"
        );
        Ok(aggregate)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderAggregate> {
        tracing::debug!(order_id = %order_id, "loading order");
        self.stores
            .orders
            .get_order(&order_id)
            .await?
            .ok_or_else(|| OrderError::order_not_found(order_id).into())
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderAggregate>> {
        tracing::debug!(?filter, "listing orders");
        self.stores.orders.list_orders(filter).await
    }

    /// Add one line at the current catalog price
    pub async fn add_line_item(&self, order_id: Uuid, line: DraftItem) -> Result<ItemUpdate> {
        self.load_open(order_id).await?;
        let item = self.price_line(order_id, &line).await?;
        let item_id = item.id;

        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                aggregate.items.push(item.clone());
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            item_id = %item_id,
            total = aggregate.order.total,
            "line item added"
        );
        ItemUpdate::from_aggregate(aggregate, item_id)
    }

    pub async fn remove_line_item(&self, item_id: Uuid) -> Result<OrderAggregate> {
        let order_id = self.order_of_item(item_id).await?;
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                remove_item(aggregate, item_id)?;
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            item_id = %item_id,
            total = aggregate.order.total,
            "line item removed"
        );
        Ok(aggregate)
    }

    pub async fn update_line_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i64,
    ) -> Result<ItemUpdate> {
        let order_id = self.order_of_item(item_id).await?;
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                set_quantity(aggregate, item_id, quantity)?;
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            item_id = %item_id,
            quantity,
            total = aggregate.order.total,
            "line item quantity changed"
        );
        ItemUpdate::from_aggregate(aggregate, item_id)
    }

    /// Toggle readiness; the first ready item moves the order to EN_PROCESO
    pub async fn set_item_ready(&self, item_id: Uuid, ready: bool) -> Result<ItemUpdate> {
        let order_id = self.order_of_item(item_id).await?;
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                set_ready(aggregate, item_id, ready)?;
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            item_id = %item_id,
            ready,
            status = %aggregate.order.status,
            "line item readiness changed"
        );
        ItemUpdate::from_aggregate(aggregate, item_id)
    }

    pub async fn set_payment(&self, order_id: Uuid, abono: i64) -> Result<OrderAggregate> {
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                if let Err(e) = pricing::apply_payment(&mut aggregate.order, abono) {
                    tracing::warn!(
                        order_id = %order_id,
                        abono,
                        total = aggregate.order.total,
                        "payment rejected"
                    );
                    return Err(e.into());
                }
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            abono,
            saldo = aggregate.order.saldo,
            "payment recorded"
        );
        Ok(aggregate)
    }

    /// Set or clear the informational discounted total
    pub async fn set_discount(
        &self,
        order_id: Uuid,
        discounted_total: Option<i64>,
    ) -> Result<OrderAggregate> {
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                pricing::apply_discount(&mut aggregate.order, discounted_total)?;
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(order_id = %order_id, ?discounted_total, "discount updated");
        Ok(aggregate)
    }

    pub async fn update_client_info(
        &self,
        order_id: Uuid,
        input: ClientInfoInput,
    ) -> Result<OrderAggregate> {
        let client = input.into_client_info()?;
        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                aggregate.order.client = client.clone();
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(order_id = %order_id, "client info updated");
        Ok(aggregate)
    }

    /// Explicit status change; forward only, delivery needs every item ready
    pub async fn set_status(&self, order_id: Uuid, target: OrderStatus) -> Result<OrderAggregate> {
        let mut from = None;
        let aggregate = self
            .modify(order_id, |aggregate| {
                let current = aggregate.order.status;
                match status::plan_transition(aggregate, target) {
                    Ok(Transition::Unchanged) => Ok(Edit::Unchanged),
                    Ok(Transition::Advance(next)) => {
                        from = Some(current);
                        aggregate.order.status = next;
                        Ok(Edit::Save)
                    }
                    Err(e) => {
                        tracing::warn!(
                            order_id = %order_id,
                            from = %current,
                            to = %target,
                            "status change rejected"
                        );
                        Err(e.into())
                    }
                }
            })
            .await?;

        if let Some(from) = from {
            tracing::info!(order_id = %order_id, %from, to = %target, "order status changed");
        }
        Ok(aggregate)
    }

    /// Mark every item ready and close the order as ENTREGADO.
    ///
    /// Fails with `IncompleteOrder` while any item is pending. Delivering a
    /// delivered order again is a no-op.
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<OrderAggregate> {
        let aggregate = self
            .modify(order_id, |aggregate| {
                if aggregate.order.status == OrderStatus::Entregado {
                    return Ok(Edit::Unchanged);
                }
                if let Err(e) = status::ensure_deliverable(aggregate) {
                    tracing::warn!(
                        order_id = %order_id,
                        pending = aggregate.pending_items(),
                        "delivery rejected"
                    );
                    return Err(e.into());
                }
                for item in &mut aggregate.items {
                    item.ready = true;
                }
                aggregate.order.status = OrderStatus::Entregado;
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(order_id = %order_id, code = %aggregate.order.code, "order delivered");
        Ok(aggregate)
    }

    /// Delete an order and its items
    pub async fn delete_order(&self, order_id: Uuid) -> Result<()> {
        if !self.stores.orders.delete_order(&order_id).await? {
            return Err(OrderError::order_not_found(order_id).into());
        }
        tracing::info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    /// Apply a whole draft in one atomic save.
    ///
    /// Changes apply in order: client info, removals, additions (merged per
    /// product first), quantity changes, readiness changes. Quantity and
    /// readiness changes for items the draft also removes are dropped. Any
    /// other failure discards the whole draft.
    pub async fn apply_batch(&self, order_id: Uuid, draft: OrderDraft) -> Result<OrderAggregate> {
        let current = self.load_open(order_id).await?;
        if draft.is_empty() {
            return Ok(current);
        }

        let OrderDraft {
            client,
            removed_items,
            added_items,
            quantity_changes,
            ready_changes,
        } = draft;

        let client = client.map(ClientInfoInput::into_client_info).transpose()?;
        let mut additions = Vec::new();
        for line in merge_draft_items(&added_items)? {
            additions.push(self.price_line(order_id, &line).await?);
        }
        let quantity_changes: Vec<_> = quantity_changes
            .into_iter()
            .filter(|change| !removed_items.contains(&change.item_id))
            .collect();
        let ready_changes: Vec<_> = ready_changes
            .into_iter()
            .filter(|change| !removed_items.contains(&change.item_id))
            .collect();

        let aggregate = self
            .modify(order_id, |aggregate| {
                ensure_open(aggregate)?;
                if let Some(client) = &client {
                    aggregate.order.client = client.clone();
                }
                for item_id in &removed_items {
                    remove_item(aggregate, *item_id)?;
                }
                aggregate.items.extend(additions.iter().cloned());
                for change in &quantity_changes {
                    set_quantity(aggregate, change.item_id, change.quantity)?;
                }
                for change in &ready_changes {
                    set_ready(aggregate, change.item_id, change.ready)?;
                }
                Ok(Edit::Save)
            })
            .await?;
        tracing::info!(
            order_id = %order_id,
            removed = removed_items.len(),
            added = additions.len(),
            quantity_changes = quantity_changes.len(),
            ready_changes = ready_changes.len(),
            total = aggregate.order.total,
            status = %aggregate.order.status,
            "order draft applied"
        );
        Ok(aggregate)
    }

    async fn load_open(&self, order_id: Uuid) -> Result<OrderAggregate> {
        let aggregate = self.get_order(order_id).await?;
        ensure_open(&aggregate)?;
        Ok(aggregate)
    }

    async fn order_of_item(&self, item_id: Uuid) -> Result<Uuid> {
        self.stores
            .orders
            .get_item(&item_id)
            .await?
            .map(|item| item.order_id)
            .ok_or_else(|| OrderError::item_not_found(item_id).into())
    }

    /// Build a line item with a frozen copy of the catalog price
    async fn price_line(&self, order_id: Uuid, line: &DraftItem) -> Result<OrderItem> {
        if line.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(line.quantity).into());
        }
        let unit_price = self.prices.resolve_unit_price(line).await?;
        Ok(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            school_id: line.school_id,
            garment_id: line.garment_id,
            size_id: line.size_id,
            quantity: line.quantity,
            unit_price,
            subtotal: pricing::line_subtotal(unit_price, line.quantity)?,
            ready: false,
            created_at: Utc::now(),
        })
    }

    /// Load an order, apply `change` and save it atomically.
    ///
    /// When another save of the same order lands first, the change is
    /// re-applied to a fresh read, up to `MAX_SAVE_ATTEMPTS` times.
    async fn modify<F>(&self, order_id: Uuid, mut change: F) -> Result<OrderAggregate>
    where
        F: FnMut(&mut OrderAggregate) -> Result<Edit>,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut aggregate = self.get_order(order_id).await?;
            if let Edit::Unchanged = change(&mut aggregate)? {
                return Ok(aggregate);
            }
            match self.commit(&mut aggregate).await {
                Ok(()) => return Ok(aggregate),
                Err(ShopError::Storage(e)) if e.is_conflict() => {
                    tracing::debug!(
                        order_id = %order_id,
                        attempt,
                        "order changed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(order_id = %order_id, "order kept changing, giving up");
        Err(StorageError::Conflict {
            message: format!(
                "order {order_id} changed concurrently {MAX_SAVE_ATTEMPTS} times in a row"
            ),
        }
        .into())
    }

    /// Re-derive totals and status, then persist over the version it was read at
    async fn commit(&self, aggregate: &mut OrderAggregate) -> Result<()> {
        if let Err(e) = pricing::recompute_totals(aggregate) {
            tracing::warn!(order_id = %aggregate.id(), error = %e, "order change rejected");
            return Err(e.into());
        }
        if let Some(next) = status::evaluate_auto_transition(aggregate) {
            tracing::info!(order_id = %aggregate.id(), to = %next, "automatic status transition");
            aggregate.order.status = next;
        }
        aggregate.order.touch();
        let read_version = aggregate.order.version;
        aggregate.order.version += 1;
        self.stores.orders.save_order(aggregate, read_version).await
    }

    async fn insert_with_fresh_code(&self, aggregate: &mut OrderAggregate) -> Result<()> {
        let prefix = &self.config.code_prefix;
        let year = aggregate.order.year;
        let year_prefix = OrderCode::year_prefix(prefix, year);

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let existing = self.stores.orders.codes_with_prefix(&year_prefix).await?;
            let code = OrderCode::next(prefix, year, existing.iter().map(String::as_str));
            aggregate.order.code = code.to_string();

            match self.stores.orders.insert_order(aggregate).await {
                Ok(()) => return Ok(()),
                Err(ShopError::Storage(e)) if e.is_conflict() => {
                    tracing::warn!(code = %aggregate.order.code, attempt, "order code taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ShopError::Internal(format!(
            "could not allocate an order code for {year} after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }
}

/// Reject changes to a delivered order
fn ensure_open(aggregate: &OrderAggregate) -> Result<()> {
    status::ensure_open(&aggregate.order).map_err(|e| {
        tracing::warn!(order_id = %aggregate.id(), "mutation on delivered order rejected");
        e.into()
    })
}

fn remove_item(aggregate: &mut OrderAggregate, item_id: Uuid) -> Result<()> {
    let position = aggregate
        .items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or_else(|| ShopError::from(OrderError::item_not_found(item_id)))?;
    aggregate.items.remove(position);
    Ok(())
}

fn set_quantity(aggregate: &mut OrderAggregate, item_id: Uuid, quantity: i64) -> Result<()> {
    let item = aggregate
        .item_mut(item_id)
        .ok_or_else(|| ShopError::from(OrderError::item_not_found(item_id)))?;
    item.subtotal = pricing::line_subtotal(item.unit_price, quantity)?;
    item.quantity = quantity;
    Ok(())
}

fn set_ready(aggregate: &mut OrderAggregate, item_id: Uuid, ready: bool) -> Result<()> {
    let item = aggregate
        .item_mut(item_id)
        .ok_or_else(|| ShopError::from(OrderError::item_not_found(item_id)))?;
    item.ready = ready;
    Ok(())
}
