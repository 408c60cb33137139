//! PostgreSQL storage backend using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! uniform-orders = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! One table per catalog entity, a `prices` table keyed by the
//! (school, garment, size) triple, `orders` with a unique `code`, and
//! `order_items` cascading from their order. Items carry a `seq` column
//! so an order always lists them in insertion order.

use crate::catalog::model::{Garment, Price, PriceKey, ReferenceCount, School, Size};
use crate::core::entity::CatalogRef;
use crate::core::error::{OrderError, Result, ShopError, StorageError};
use crate::core::query::{OrderFilter, Page};
use crate::core::service::{
    CatalogStore, DataService, OrderStore, OrderTotals, QuantityByRef, RankingDimension,
};
use crate::orders::model::{Order, OrderAggregate, OrderItem};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schools (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS garments (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sizes (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        display_order INTEGER NOT NULL DEFAULT 0,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS prices (
        school_id UUID NOT NULL REFERENCES schools(id),
        garment_id UUID NOT NULL REFERENCES garments(id),
        size_id UUID NOT NULL REFERENCES sizes(id),
        price BIGINT NOT NULL CHECK (price >= 0),
        PRIMARY KEY (school_id, garment_id, size_id)
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        code TEXT NOT NULL,
        client_name TEXT NOT NULL,
        client_surname TEXT NULL,
        client_phone TEXT NULL,
        client_email TEXT NULL,
        detail VARCHAR(500) NULL,
        year INTEGER NOT NULL,
        delivery_date DATE NULL,
        status TEXT NOT NULL,
        total BIGINT NOT NULL,
        abono BIGINT NOT NULL,
        saldo BIGINT NOT NULL,
        discounted_total BIGINT NULL,
        version BIGINT NOT NULL DEFAULT 1,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CHECK (abono >= 0 AND abono <= total AND saldo = total - abono)
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_code ON orders (code)",
    "CREATE INDEX IF NOT EXISTS idx_orders_created ON orders (created_at DESC)",
    "CREATE TABLE IF NOT EXISTS order_items (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        school_id UUID NOT NULL REFERENCES schools(id),
        garment_id UUID NOT NULL REFERENCES garments(id),
        size_id UUID NOT NULL REFERENCES sizes(id),
        quantity BIGINT NOT NULL CHECK (quantity > 0),
        unit_price BIGINT NOT NULL,
        subtotal BIGINT NOT NULL,
        ready BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items (order_id, seq)",
];

/// Apply the required tables and indexes (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PostgresStore
// ---------------------------------------------------------------------------

/// Backend implementing every storage trait on a `PgPool`
///
/// # Example
///
/// ```rust,ignore
/// let store = PostgresStore::connect("postgres://localhost/uniforms", 5).await?;
/// store.ensure_schema().await?;
/// let stores = Stores::from_backend(store);
/// ```
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection {
                backend: "PostgreSQL".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        ensure_schema(&self.pool).await
    }

    async fn fetch_by_id<T>(&self, table: &str, id: &Uuid) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {table} WHERE id = $1");
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn fetch_all<T>(&self, table: &str) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {table}");
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    async fn delete_by_id(&self, table: &str, id: &Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn items_of(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY seq",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderAggregate>> {
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items = self.items_of(&ids).await?;
        Ok(orders
            .into_iter()
            .map(|order| {
                let order_items = items.remove(&order.id).unwrap_or_default();
                OrderAggregate::new(order, order_items)
            })
            .collect())
    }
}

fn not_found(entity_type: &str, id: &Uuid) -> ShopError {
    crate::core::error::CatalogError::NotFound {
        entity_type: entity_type.to_string(),
        id: *id,
    }
    .into()
}

fn reference_column(target: CatalogRef) -> &'static str {
    match target {
        CatalogRef::School(_) => "school_id",
        CatalogRef::Garment(_) => "garment_id",
        CatalogRef::Size(_) => "size_id",
    }
}

/// `%term%` with LIKE wildcards escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_order_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (client_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR client_surname ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// ---------------------------------------------------------------------------
// Catalog tables
// ---------------------------------------------------------------------------

#[async_trait]
impl DataService<School> for PostgresStore {
    async fn create(&self, entity: School) -> Result<School> {
        sqlx::query(
            "INSERT INTO schools (id, name, active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.active)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<School>> {
        self.fetch_by_id("schools", id).await
    }

    async fn list(&self) -> Result<Vec<School>> {
        self.fetch_all("schools").await
    }

    async fn update(&self, id: &Uuid, entity: School) -> Result<School> {
        let result =
            sqlx::query("UPDATE schools SET name = $2, active = $3, updated_at = $4 WHERE id = $1")
                .bind(id)
                .bind(&entity.name)
                .bind(entity.active)
                .bind(entity.updated_at)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("school", id));
        }
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        self.delete_by_id("schools", id).await
    }
}

#[async_trait]
impl DataService<Garment> for PostgresStore {
    async fn create(&self, entity: Garment) -> Result<Garment> {
        sqlx::query(
            "INSERT INTO garments (id, name, description, active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.active)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Garment>> {
        self.fetch_by_id("garments", id).await
    }

    async fn list(&self) -> Result<Vec<Garment>> {
        self.fetch_all("garments").await
    }

    async fn update(&self, id: &Uuid, entity: Garment) -> Result<Garment> {
        let result = sqlx::query(
            "UPDATE garments SET name = $2, description = $3, active = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.active)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("garment", id));
        }
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        self.delete_by_id("garments", id).await
    }
}

#[async_trait]
impl DataService<Size> for PostgresStore {
    async fn create(&self, entity: Size) -> Result<Size> {
        sqlx::query(
            "INSERT INTO sizes (id, name, display_order, active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.display_order)
        .bind(entity.active)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Size>> {
        self.fetch_by_id("sizes", id).await
    }

    async fn list(&self) -> Result<Vec<Size>> {
        self.fetch_all("sizes").await
    }

    async fn update(&self, id: &Uuid, entity: Size) -> Result<Size> {
        let result = sqlx::query(
            "UPDATE sizes SET name = $2, display_order = $3, active = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&entity.name)
        .bind(entity.display_order)
        .bind(entity.active)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("size", id));
        }
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        self.delete_by_id("sizes", id).await
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn find_price(&self, key: &PriceKey) -> Result<Option<Price>> {
        Ok(sqlx::query_as::<_, Price>(
            "SELECT * FROM prices WHERE school_id = $1 AND garment_id = $2 AND size_id = $3",
        )
        .bind(key.school_id)
        .bind(key.garment_id)
        .bind(key.size_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_price(&self, price: Price) -> Result<Price> {
        sqlx::query(
            "INSERT INTO prices (school_id, garment_id, size_id, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(price.school_id)
        .bind(price.garment_id)
        .bind(price.size_id)
        .bind(price.price)
        .execute(&self.pool)
        .await?;
        Ok(price)
    }

    async fn update_price(&self, key: &PriceKey, amount: i64) -> Result<Option<Price>> {
        Ok(sqlx::query_as::<_, Price>(
            "UPDATE prices SET price = $4
             WHERE school_id = $1 AND garment_id = $2 AND size_id = $3
             RETURNING *",
        )
        .bind(key.school_id)
        .bind(key.garment_id)
        .bind(key.size_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_price(&self, key: &PriceKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM prices WHERE school_id = $1 AND garment_id = $2 AND size_id = $3",
        )
        .bind(key.school_id)
        .bind(key.garment_id)
        .bind(key.size_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_prices(&self) -> Result<Vec<Price>> {
        self.fetch_all("prices").await
    }

    async fn count_references(&self, target: CatalogRef) -> Result<ReferenceCount> {
        let column = reference_column(target);

        let items: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM order_items WHERE {column} = $1"
        ))
        .bind(target.id())
        .fetch_one(&self.pool)
        .await?;

        let prices: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM prices WHERE {column} = $1"))
                .bind(target.id())
                .fetch_one(&self.pool)
                .await?;

        Ok(ReferenceCount {
            prices: prices as u64,
            items: items as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

async fn upsert_item(tx: &mut Transaction<'_, Postgres>, item: &OrderItem) -> Result<()> {
    sqlx::query(
        "INSERT INTO order_items
            (id, order_id, school_id, garment_id, size_id, quantity, unit_price, subtotal, ready, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO UPDATE SET
            quantity = EXCLUDED.quantity,
            unit_price = EXCLUDED.unit_price,
            subtotal = EXCLUDED.subtotal,
            ready = EXCLUDED.ready",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.school_id)
    .bind(item.garment_id)
    .bind(item.size_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.subtotal)
    .bind(item.ready)
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn get_order(&self, id: &Uuid) -> Result<Option<OrderAggregate>> {
        let Some(order) = self.fetch_by_id::<Order>("orders", id).await? else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY seq",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(OrderAggregate::new(order, items)))
    }

    async fn get_item(&self, item_id: &Uuid) -> Result<Option<OrderItem>> {
        self.fetch_by_id("order_items", item_id).await
    }

    async fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT code FROM orders WHERE starts_with(code, $1)")
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_order(&self, aggregate: &OrderAggregate) -> Result<()> {
        let order = &aggregate.order;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders
                (id, code, client_name, client_surname, client_phone, client_email, detail,
                 year, delivery_date, status, total, abono, saldo, discounted_total,
                 version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(order.id)
        .bind(&order.code)
        .bind(&order.client.client_name)
        .bind(&order.client.client_surname)
        .bind(&order.client.client_phone)
        .bind(&order.client.client_email)
        .bind(&order.client.detail)
        .bind(order.year)
        .bind(order.delivery_date)
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.abono)
        .bind(order.saldo)
        .bind(order.discounted_total)
        .bind(order.version)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &aggregate.items {
            upsert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_order(&self, aggregate: &OrderAggregate, expected_version: i64) -> Result<()> {
        let order = &aggregate.order;
        let mut tx = self.pool.begin().await?;

        // the row lock serializes saves of one order
        let result = sqlx::query(
            "UPDATE orders SET
                client_name = $2, client_surname = $3, client_phone = $4, client_email = $5,
                detail = $6, delivery_date = $7, status = $8, total = $9, abono = $10,
                saldo = $11, discounted_total = $12, updated_at = $13, version = $14
             WHERE id = $1 AND version = $15",
        )
        .bind(order.id)
        .bind(&order.client.client_name)
        .bind(&order.client.client_surname)
        .bind(&order.client.client_phone)
        .bind(&order.client.client_email)
        .bind(&order.client.detail)
        .bind(order.delivery_date)
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.abono)
        .bind(order.saldo)
        .bind(order.discounted_total)
        .bind(order.updated_at)
        .bind(order.version)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                    .bind(order.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match current {
                None => OrderError::order_not_found(order.id).into(),
                Some(version) => StorageError::Conflict {
                    message: format!(
                        "order '{}' is at version {version}, not {expected_version}",
                        order.code
                    ),
                }
                .into(),
            });
        }

        let kept: Vec<Uuid> = aggregate.items.iter().map(|item| item.id).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id)
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        for item in &aggregate.items {
            upsert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, id: &Uuid) -> Result<bool> {
        self.delete_by_id("orders", id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderAggregate>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        push_order_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, code DESC LIMIT ")
            .push_bind(filter.limit as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));
        let orders: Vec<Order> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: self.with_items(orders).await?,
            total: total as usize,
        })
    }

    async fn order_totals(&self) -> Result<OrderTotals> {
        let (total_orders, ingresado, en_proceso, entregado, total_sales, outstanding_balance): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'INGRESADO'),
                COUNT(*) FILTER (WHERE status = 'EN_PROCESO'),
                COUNT(*) FILTER (WHERE status = 'ENTREGADO'),
                COALESCE(SUM(total), 0)::BIGINT,
                COALESCE(SUM(saldo), 0)::BIGINT
             FROM orders",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderTotals {
            total_orders: total_orders as u64,
            ingresado: ingresado as u64,
            en_proceso: en_proceso as u64,
            entregado: entregado as u64,
            total_sales,
            outstanding_balance,
        })
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<OrderAggregate>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders ORDER BY created_at DESC, code DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        self.with_items(orders).await
    }

    async fn quantity_ranking(
        &self,
        by: RankingDimension,
        limit: usize,
    ) -> Result<Vec<QuantityByRef>> {
        let column = match by {
            RankingDimension::Garment => "garment_id",
            RankingDimension::School => "school_id",
        };
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(&format!(
            "SELECT {column}, SUM(quantity)::BIGINT AS quantity
             FROM order_items
             GROUP BY {column}
             ORDER BY quantity DESC, {column}
             LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, quantity)| QuantityByRef { id, quantity })
            .collect())
    }
}
