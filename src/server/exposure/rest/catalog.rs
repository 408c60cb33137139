//! Catalog handlers: schools, garments, sizes and the price table

use crate::catalog::model::{Price, PriceAmount, PriceInput, PriceKey, PriceView};
use crate::core::error::ShopError;
use crate::core::response::ApiResponse;
use crate::core::validation::{JsonBody, QueryParams, parse_id};
use crate::server::host::{AppState, CatalogResource};
use axum::extract::{Path, State};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActiveFilter {
    /// Only entries still offered for new orders
    pub active: Option<bool>,
}

pub async fn list_entities<T>(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<ActiveFilter>,
) -> Result<ApiResponse<Vec<T>>, ShopError>
where
    T: CatalogResource + Serialize,
    T::Input: Validate,
{
    let entries = T::service(&state)
        .list(filter.active.unwrap_or(false))
        .await?;
    Ok(ApiResponse::ok(entries))
}

pub async fn get_entity<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<T>, ShopError>
where
    T: CatalogResource + Serialize,
    T::Input: Validate,
{
    let entry = T::service(&state).get(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn create_entity<T>(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<T::Input>,
) -> Result<ApiResponse<T>, ShopError>
where
    T: CatalogResource + Serialize,
    T::Input: DeserializeOwned + Validate,
{
    let created = T::service(&state).create(input).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_entity<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<T::Input>,
) -> Result<ApiResponse<T>, ShopError>
where
    T: CatalogResource + Serialize,
    T::Input: DeserializeOwned + Validate,
{
    let updated = T::service(&state).update(parse_id(&id)?, input).await?;
    Ok(ApiResponse::ok(updated))
}

pub async fn delete_entity<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ShopError>
where
    T: CatalogResource,
    T::Input: Validate,
{
    T::service(&state).delete(parse_id(&id)?).await?;
    Ok(ApiResponse::empty())
}

fn price_key((school, garment, size): (String, String, String)) -> Result<PriceKey, ShopError> {
    Ok(PriceKey::new(
        parse_id(&school)?,
        parse_id(&garment)?,
        parse_id(&size)?,
    ))
}

pub async fn list_prices(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<PriceView>>, ShopError> {
    Ok(ApiResponse::ok(state.prices.list_prices().await?))
}

pub async fn find_price(
    State(state): State<AppState>,
    Path(segments): Path<(String, String, String)>,
) -> Result<ApiResponse<Price>, ShopError> {
    let key = price_key(segments)?;
    Ok(ApiResponse::ok(state.prices.find_price(&key).await?))
}

pub async fn create_price(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PriceInput>,
) -> Result<ApiResponse<Price>, ShopError> {
    Ok(ApiResponse::created(state.prices.create_price(input).await?))
}

pub async fn update_price(
    State(state): State<AppState>,
    Path(segments): Path<(String, String, String)>,
    JsonBody(input): JsonBody<PriceAmount>,
) -> Result<ApiResponse<Price>, ShopError> {
    let key = price_key(segments)?;
    Ok(ApiResponse::ok(state.prices.update_price(&key, input).await?))
}

pub async fn delete_price(
    State(state): State<AppState>,
    Path(segments): Path<(String, String, String)>,
) -> Result<ApiResponse<()>, ShopError> {
    let key = price_key(segments)?;
    state.prices.delete_price(&key).await?;
    Ok(ApiResponse::empty())
}
