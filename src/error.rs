//! Service error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::cart::CartError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing product, cart, order, or line item. Holds the full message.
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Insufficient stock for {name}. Only {available} available.")]
    InsufficientStock { name: String, available: i32 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Not authorized to view this order")]
    Forbidden,

    /// Best-effort notification failure. Logged by the dispatcher, never
    /// surfaced to a client and never rolls back an order.
    #[error("notification dispatch failed: {0}")]
    Notification(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) | Error::InsufficientStock { .. } | Error::EmptyCart => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Notification(_) | Error::Internal(_) | Error::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            return (status, Json(json!({ "message": "Internal server error" }))).into_response();
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<CartError> for Error {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound => Error::NotFound("Item not found in cart"),
            CartError::InvalidQuantity => {
                Error::Validation("Quantity must be at least 1".to_string())
            }
        }
    }
}
