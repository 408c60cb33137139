//! Typed error handling for the order service
//!
//! Every fallible operation in the crate returns [`ShopError`], which wraps a
//! category-specific error so callers can match on the exact failure instead
//! of parsing messages.
//!
//! # Error Categories
//!
//! - [`CatalogError`]: schools, garments, sizes and the price table
//! - [`OrderError`]: order aggregate rules (payments, items, status machine)
//! - [`ValidationError`]: malformed input
//! - [`StorageError`]: persistence backends
//! - [`ConfigError`]: configuration loading
//!
//! # Example
//!
//! ```rust,ignore
//! match service.mark_delivered(order_id).await {
//!     Ok(order) => println!("Delivered {}", order.order.code),
//!     Err(ShopError::Order(OrderError::IncompleteOrder { pending, .. })) => {
//!         println!("{} items still pending", pending);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::orders::model::OrderStatus;

/// Result alias used across the crate
pub type Result<T, E = ShopError> = std::result::Result<T, E>;

/// The main error type of the crate
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    /// Catalog errors (schools, garments, sizes, prices)
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Order aggregate errors
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body embedded in the failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Failure envelope: `{"success": false, "error": {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorResponse,
}

impl ShopError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShopError::Catalog(e) => e.status_code(),
            ShopError::Order(e) => e.status_code(),
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShopError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ShopError::Catalog(e) => e.error_code(),
            ShopError::Order(e) => e.error_code(),
            ShopError::Validation(_) => "VALIDATION_ERROR",
            ShopError::Storage(_) => "STORAGE_ERROR",
            ShopError::Config(_) => "CONFIG_ERROR",
            ShopError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Whether the failure was caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ShopError::Catalog(CatalogError::NotFound { entity_type, id })
            | ShopError::Order(OrderError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            ShopError::Catalog(CatalogError::PriceNotFound {
                school_id,
                garment_id,
                size_id,
            })
            | ShopError::Catalog(CatalogError::DuplicatePrice {
                school_id,
                garment_id,
                size_id,
            }) => Some(serde_json::json!({
                "school_id": school_id.to_string(),
                "garment_id": garment_id.to_string(),
                "size_id": size_id.to_string()
            })),
            ShopError::Catalog(CatalogError::ReferencedEntity {
                entity_type,
                id,
                prices,
                items,
            }) => Some(serde_json::json!({
                "entity_type": entity_type,
                "id": id.to_string(),
                "prices": prices,
                "items": items,
                "count": prices + items
            })),
            ShopError::Order(OrderError::IncompleteOrder { pending, .. }) => {
                Some(serde_json::json!({ "pending_items": pending }))
            }
            ShopError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        let body = Json(ErrorEnvelope {
            success: false,
            error: self.to_response(),
        });
        (status, body).into_response()
    }
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Errors raised by catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// School, garment or size does not exist
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    /// No catalog price for the requested triple
    #[error("No price defined for school '{school_id}', garment '{garment_id}', size '{size_id}'")]
    PriceNotFound {
        school_id: Uuid,
        garment_id: Uuid,
        size_id: Uuid,
    },

    /// A price already exists for the triple
    #[error(
        "A price already exists for school '{school_id}', garment '{garment_id}', size '{size_id}'"
    )]
    DuplicatePrice {
        school_id: Uuid,
        garment_id: Uuid,
        size_id: Uuid,
    },

    /// The entity is still referenced by prices or order items
    #[error(
        "Cannot delete {entity_type} '{id}': referenced by {} record(s) ({prices} price(s), {items} order item(s))",
        .prices + .items
    )]
    ReferencedEntity {
        entity_type: String,
        id: Uuid,
        prices: u64,
        items: u64,
    },
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::PriceNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CatalogError::DuplicatePrice { .. } => StatusCode::CONFLICT,
            CatalogError::ReferencedEntity { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::NotFound { .. } => "NOT_FOUND",
            CatalogError::PriceNotFound { .. } => "PRICE_NOT_FOUND",
            CatalogError::DuplicatePrice { .. } => "DUPLICATE_PRICE",
            CatalogError::ReferencedEntity { .. } => "REFERENCED_ENTITY",
        }
    }

    /// Number of records blocking a delete, if this is a reference error
    pub fn blocking_count(&self) -> Option<u64> {
        match self {
            CatalogError::ReferencedEntity { prices, items, .. } => Some(prices + items),
            _ => None,
        }
    }
}

// =============================================================================
// Order Errors
// =============================================================================

/// Errors raised by the order aggregate
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Order or order item does not exist
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    /// Order creation without items
    #[error("An order needs at least one item")]
    EmptyOrder,

    /// Payment outside `0..=total`, or a change that would leave it there
    #[error("Invalid amount {amount}: must be between 0 and the order total {total}")]
    InvalidAmount { amount: i64, total: i64 },

    /// Quantity must be a positive integer
    #[error("Invalid quantity {0}: must be greater than zero")]
    InvalidQuantity(i64),

    /// Money arithmetic left the supported range
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(String),

    /// Delivery requested while items are still pending
    #[error("Order '{code}' cannot be delivered: {pending} item(s) are not ready")]
    IncompleteOrder { code: String, pending: usize },

    /// Mutation attempted on a delivered order
    #[error("Order '{code}' is delivered and can no longer be modified")]
    OrderClosed { code: String },

    /// Status change not allowed by the lifecycle
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::EmptyOrder => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::InvalidAmount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::InvalidQuantity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::AmountOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::IncompleteOrder { .. } => StatusCode::CONFLICT,
            OrderError::OrderClosed { .. } => StatusCode::CONFLICT,
            OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            OrderError::NotFound { .. } => "NOT_FOUND",
            OrderError::EmptyOrder => "EMPTY_ORDER",
            OrderError::InvalidAmount { .. } => "INVALID_AMOUNT",
            OrderError::InvalidQuantity(_) => "INVALID_QUANTITY",
            OrderError::AmountOverflow(_) => "INVALID_AMOUNT",
            OrderError::IncompleteOrder { .. } => "INCOMPLETE_ORDER",
            OrderError::OrderClosed { .. } => "ORDER_CLOSED",
            OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }

    pub(crate) fn order_not_found(id: Uuid) -> Self {
        OrderError::NotFound {
            entity_type: "order".to_string(),
            id,
        }
    }

    pub(crate) fn item_not_found(id: Uuid) -> Self {
        OrderError::NotFound {
            entity_type: "order_item".to_string(),
            id,
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation errors: {}", format_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid UUID format: {value}")]
    InvalidUuid { value: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| FieldValidationError {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ShopError::Validation(errors.into())
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    #[error("{backend} query error: {message}")]
    Query { backend: String, message: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// A uniqueness constraint rejected the write
    #[error("Conflicting write: {message}")]
    Conflict { message: String },

    #[error("Data integrity error: {message}")]
    Integrity { message: String },
}

impl StorageError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict {
                message: db.message().to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection {
                    backend: "PostgreSQL".to_string(),
                    message: err.to_string(),
                }
            }
            _ => StorageError::Query {
                backend: "PostgreSQL".to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ShopError {
    fn from(err: sqlx::Error) -> Self {
        ShopError::Storage(err.into())
    }
}

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{f}'")).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}
