//! Core building blocks shared by the catalog, orders and storage modules

pub mod entity;
pub mod error;
pub mod query;
pub mod response;
pub mod service;
pub mod validation;

pub use entity::{CatalogEntity, CatalogRef, Entity};
pub use error::{
    CatalogError, ConfigError, OrderError, Result, ShopError, StorageError, ValidationError,
};
pub use query::{OrderFilter, OrderQueryParams, Page, PaginatedResponse, PaginationMeta};
pub use response::ApiResponse;
pub use service::{
    CatalogStore, DataService, OrderStore, OrderTotals, QuantityByRef, RankingDimension,
    ShopBackend,
};
pub use validation::{JsonBody, QueryParams, parse_id};
