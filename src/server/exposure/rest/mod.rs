//! REST exposure
//!
//! Consumes an [`AppState`] and produces the Axum `Router` with every
//! catalog, order and dashboard route plus the health checks.

pub mod catalog;
pub mod orders;

use crate::catalog::model::{Garment, School, Size};
use crate::server::host::AppState;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

pub struct RestExposure;

impl RestExposure {
    /// Build the REST router over the given state
    pub fn build_router(state: AppState) -> Router {
        Self::health_routes()
            .merge(Self::catalog_routes())
            .merge(Self::order_routes())
            .with_state(state)
    }

    fn health_routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    fn catalog_routes() -> Router<AppState> {
        use catalog::*;

        Router::new()
            .route(
                "/schools",
                get(list_entities::<School>).post(create_entity::<School>),
            )
            .route(
                "/schools/{id}",
                get(get_entity::<School>)
                    .put(update_entity::<School>)
                    .delete(delete_entity::<School>),
            )
            .route(
                "/garments",
                get(list_entities::<Garment>).post(create_entity::<Garment>),
            )
            .route(
                "/garments/{id}",
                get(get_entity::<Garment>)
                    .put(update_entity::<Garment>)
                    .delete(delete_entity::<Garment>),
            )
            .route(
                "/sizes",
                get(list_entities::<Size>).post(create_entity::<Size>),
            )
            .route(
                "/sizes/{id}",
                get(get_entity::<Size>)
                    .put(update_entity::<Size>)
                    .delete(delete_entity::<Size>),
            )
            .route("/prices", get(list_prices).post(create_price))
            .route(
                "/prices/{school_id}/{garment_id}/{size_id}",
                get(find_price).put(update_price).delete(delete_price),
            )
    }

    fn order_routes() -> Router<AppState> {
        use orders::*;

        Router::new()
            .route("/orders", get(list_orders).post(create_order))
            .route("/orders/{id}", get(get_order).delete(delete_order))
            .route("/orders/{id}/items", post(add_line_item))
            .route("/orders/{id}/payment", put(set_payment))
            .route("/orders/{id}/discount", put(set_discount))
            .route("/orders/{id}/client", put(update_client_info))
            .route("/orders/{id}/status", put(set_status))
            .route("/orders/{id}/deliver", post(mark_delivered))
            .route("/orders/{id}/batch", post(apply_batch))
            .route("/items/{id}", axum::routing::delete(remove_line_item))
            .route("/items/{id}/quantity", put(update_line_item_quantity))
            .route("/items/{id}/ready", put(set_item_ready))
            .route("/dashboard", get(dashboard))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "uniform-orders"
        }))
    }
}
