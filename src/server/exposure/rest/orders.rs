//! Order, line item and dashboard handlers
//!
//! Every order comes back as an [`OrderView`]: the aggregate with its items
//! plus the derived school and progress.

use crate::core::error::ShopError;
use crate::core::query::{OrderFilter, OrderQueryParams, PaginatedResponse, PaginationMeta};
use crate::core::response::ApiResponse;
use crate::core::validation::{JsonBody, QueryParams, parse_id};
use crate::orders::dashboard::DashboardSummary;
use crate::orders::draft::OrderDraft;
use crate::orders::input::{
    ClientInfoInput, DiscountInput, DraftItem, NewOrder, PaymentInput, QuantityInput, ReadyInput,
    StatusInput,
};
use crate::orders::model::{OrderItem, OrderView};
use crate::orders::service::ItemUpdate;
use crate::server::host::AppState;
use axum::extract::{Path, State};
use serde::Serialize;

/// A line item next to its order after the change
#[derive(Debug, Serialize)]
pub struct ItemUpdateView {
    pub item: OrderItem,
    pub order: OrderView,
}

impl From<ItemUpdate> for ItemUpdateView {
    fn from(update: ItemUpdate) -> Self {
        Self {
            item: update.item,
            order: update.order.into(),
        }
    }
}

type OrderResponse = Result<ApiResponse<OrderView>, ShopError>;
type ItemResponse = Result<ApiResponse<ItemUpdateView>, ShopError>;

pub async fn list_orders(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<OrderQueryParams>,
) -> Result<ApiResponse<PaginatedResponse<OrderView>>, ShopError> {
    let config = state.orders_config();
    let filter =
        OrderFilter::from_params(params, config.default_page_size, config.max_page_size);
    let page = state.orders.list_orders(&filter).await?;

    Ok(ApiResponse::ok(PaginatedResponse {
        pagination: PaginationMeta::new(filter.page, filter.limit, page.total),
        data: page.items.into_iter().map(OrderView::from).collect(),
    }))
}

pub async fn create_order(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewOrder>,
) -> OrderResponse {
    let created = state.orders.create_order(input).await?;
    Ok(ApiResponse::created(created.into()))
}

pub async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> OrderResponse {
    let order = state.orders.get_order(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ShopError> {
    state.orders.delete_order(parse_id(&id)?).await?;
    Ok(ApiResponse::empty())
}

pub async fn add_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(line): JsonBody<DraftItem>,
) -> ItemResponse {
    let update = state.orders.add_line_item(parse_id(&id)?, line).await?;
    Ok(ApiResponse::created(update.into()))
}

pub async fn set_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PaymentInput>,
) -> OrderResponse {
    let order = state.orders.set_payment(parse_id(&id)?, input.abono).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn set_discount(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<DiscountInput>,
) -> OrderResponse {
    let order = state
        .orders
        .set_discount(parse_id(&id)?, input.discounted_total)
        .await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn update_client_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ClientInfoInput>,
) -> OrderResponse {
    let order = state.orders.update_client_info(parse_id(&id)?, input).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<StatusInput>,
) -> OrderResponse {
    let order = state.orders.set_status(parse_id(&id)?, input.status).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> OrderResponse {
    let order = state.orders.mark_delivered(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn apply_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(draft): JsonBody<OrderDraft>,
) -> OrderResponse {
    let order = state.orders.apply_batch(parse_id(&id)?, draft).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn remove_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> OrderResponse {
    let order = state.orders.remove_line_item(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(order.into()))
}

pub async fn update_line_item_quantity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<QuantityInput>,
) -> ItemResponse {
    let update = state
        .orders
        .update_line_item_quantity(parse_id(&id)?, input.quantity)
        .await?;
    Ok(ApiResponse::ok(update.into()))
}

pub async fn set_item_ready(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ReadyInput>,
) -> ItemResponse {
    let update = state
        .orders
        .set_item_ready(parse_id(&id)?, input.ready)
        .await?;
    Ok(ApiResponse::ok(update.into()))
}

pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<ApiResponse<DashboardSummary>, ShopError> {
    Ok(ApiResponse::ok(state.dashboard.summary().await?))
}
