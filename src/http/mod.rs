//! HTTP surface.

pub mod cart;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(products::list))
        .route("/api/products/categories", get(products::categories))
        .route("/api/products/sizes", get(products::sizes))
        .route("/api/products/:id", get(products::get))
        .route("/api/cart", get(cart::get))
        .route("/api/cart/add", post(cart::add))
        .route("/api/cart/update", put(cart::update))
        .route("/api/cart/remove", delete(cart::remove))
        .route("/api/cart/clear", delete(cart::clear))
        .route("/api/cart/merge", post(cart::merge))
        .route("/api/orders", get(orders::list).post(orders::create))
        .route("/api/orders/:id", get(orders::get))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "clothing-store" }))
}

/// Runs derive-level validation, surfacing the first message as a 400.
fn check<T: Validate>(payload: &T) -> Result<()> {
    payload.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .into_values()
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref().map(ToString::to_string))
            .next()
            .unwrap_or_else(|| "Invalid request".to_string());
        Error::Validation(message)
    })
}
