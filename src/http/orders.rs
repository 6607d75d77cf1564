//! Order endpoints. All require an identity.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::AppState;
use crate::checkout::{self, OrderReceipt};
use crate::domain::order::Order;
use crate::error::{Error, Result};
use crate::identity::Identity;

/// Converts the caller's current cart into an order. Takes no body.
pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<(StatusCode, Json<OrderReceipt>)> {
    let receipt =
        checkout::place_order(state.store.as_ref(), state.notifier.clone(), &identity).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.store.orders_for_user(identity.user_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    let order = state.store.get_order(id).await?;
    if order.user_id != identity.user_id {
        return Err(Error::Forbidden);
    }
    Ok(Json(order))
}
