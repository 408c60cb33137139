//! Input validation helpers and the JSON body extractor
//!
//! Request payloads derive [`validator::Validate`]; the services call
//! [`validate`] before touching storage so that a rejected request never
//! leaves partial effects.

use crate::core::error::{ShopError, ValidationError};
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::Validate;

/// Maximum length of the free-text order detail
pub const MAX_DETAIL_LEN: u64 = 500;

/// Accepted range for the order year
pub const MIN_ORDER_YEAR: i32 = 2000;
pub const MAX_ORDER_YEAR: i32 = 2100;

/// Digits, spaces, `+`, `-`, parentheses; 6 to 20 characters
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+0-9 ()\-]{6,20}$").expect("phone pattern is valid"));

/// Rejects empty and whitespace-only text
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Run the derive-generated validation and convert the failure
pub fn validate<T: Validate>(input: &T) -> Result<(), ShopError> {
    input.validate().map_err(ShopError::from)
}

/// Trim a required string
pub fn normalize_required(value: &str) -> String {
    value.trim().to_string()
}

/// Trim an optional string, turning blanks into `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// JSON body extractor that reports malformed payloads with the error envelope
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn create_order(
///     State(state): State<OrderState>,
///     JsonBody(payload): JsonBody<NewOrder>,
/// ) -> Result<ApiResponse<OrderView>, ShopError> {
///     // payload is a typed NewOrder
/// }
/// ```
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ValidationError::InvalidJson {
                message: rejection.body_text(),
            }
            .into()),
        }
    }
}

/// Query-string extractor that reports bad parameters with the error envelope
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(ValidationError::FieldError {
                field: "query".to_string(),
                message: rejection.body_text(),
            }
            .into()),
        }
    }
}

/// Parse a path segment as an id
pub fn parse_id(raw: &str) -> Result<Uuid, ShopError> {
    Uuid::parse_str(raw).map_err(|_| {
        ValidationError::InvalidUuid {
            value: raw.to_string(),
        }
        .into()
    })
}
