//! # uniform-orders
//!
//! Catalog and order management for a school uniform vendor.
//!
//! The catalog holds schools, garments and sizes, plus one price for each
//! school/garment/size combination. Orders snapshot those prices into line
//! items, keep their totals and balance consistent on every change, and move
//! through `INGRESADO`, `EN_PROCESO` and `ENTREGADO` as items are produced and
//! handed over.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use uniform_orders::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ShopConfig::default();
//!     ServerBuilder::new(config)
//!         .with_stores(Stores::in_memory())
//!         .serve()
//!         .await
//! }
//! ```
//!
//! ## Storage
//!
//! - `in-memory` (default): process-local tables, for tests and demos
//! - `postgres`: sqlx-backed tables with transactional order writes

pub mod catalog;
pub mod config;
pub mod core;
pub mod orders;
pub mod server;
pub mod storage;

/// Re-exports of the types most callers need
pub mod prelude {
    pub use crate::catalog::{
        CatalogService, Garment, GarmentInput, Price, PriceAmount, PriceInput, PriceKey,
        PriceService, PriceView, School, SchoolInput, Size, SizeInput,
    };
    pub use crate::config::{ShopConfig, StorageBackend};
    pub use crate::core::{
        ApiResponse, CatalogEntity, CatalogError, CatalogRef, Entity, OrderError, OrderFilter,
        Result, ShopError, StorageError, ValidationError,
    };
    pub use crate::orders::{
        ClientInfoInput, DashboardService, DashboardSummary, DraftItem, ItemUpdate, NewOrder,
        Order, OrderAggregate, OrderDraft, OrderItem, OrderService, OrderStatus, OrderView,
        QuantityChange, ReadyChange,
    };
    pub use crate::server::{AppState, ServerBuilder};
    pub use crate::storage::Stores;

    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;
}
