//! Catalog endpoints. Public, no identity required.

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use super::AppState;
use crate::domain::catalog::{CatalogFilter, Page};
use crate::domain::product::{Product, Size};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<Page<Product>>> {
    Ok(Json(state.store.list_products(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    Ok(Json(state.store.get_product(id).await?))
}

/// Distinct categories, with the `All` sentinel the filter UI leads with.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let mut out = vec!["All".to_string()];
    out.extend(
        state
            .store
            .categories()
            .await?
            .into_iter()
            .map(|c| c.to_string()),
    );
    Ok(Json(out))
}

pub async fn sizes(State(state): State<AppState>) -> Result<Json<Vec<Size>>> {
    Ok(Json(state.store.sizes().await?))
}
