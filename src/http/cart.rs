//! Cart endpoints. All require an identity.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::{check, AppState};
use crate::domain::cart::CartLine;
use crate::domain::product::Size;
use crate::error::Result;
use crate::identity::Identity;
use crate::store::CartView;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub size: Size,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub qty: i32,
}

impl CartItemRequest {
    fn line(&self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            size: self.size,
            qty: self.qty,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: Uuid,
    pub size: Size,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergeRequest {
    #[validate]
    pub items: Vec<CartItemRequest>,
}

pub async fn get(State(state): State<AppState>, identity: Identity) -> Result<Json<CartView>> {
    Ok(Json(state.store.cart(identity.user_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CartItemRequest>,
) -> Result<Json<CartView>> {
    check(&request)?;
    Ok(Json(
        state
            .store
            .add_item(identity.user_id, request.line())
            .await?,
    ))
}

pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CartItemRequest>,
) -> Result<Json<CartView>> {
    check(&request)?;
    Ok(Json(
        state
            .store
            .update_item(identity.user_id, request.line())
            .await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(
        state
            .store
            .remove_item(identity.user_id, request.product_id, request.size)
            .await?,
    ))
}

pub async fn clear(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<serde_json::Value>> {
    state.store.clear_cart(identity.user_id).await?;
    Ok(Json(json!({ "message": "Cart cleared successfully" })))
}

/// Uploads a guest cart at login and merges it into the server cart.
pub async fn merge(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<MergeRequest>,
) -> Result<Json<CartView>> {
    check(&request)?;
    let lines: Vec<CartLine> = request.items.iter().map(CartItemRequest::line).collect();
    Ok(Json(
        state.store.merge_cart(identity.user_id, &lines).await?,
    ))
}
