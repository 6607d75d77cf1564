//! Cart aggregate.
//!
//! Line items are keyed by (product, size): adding an already-present pair
//! merges quantities instead of inserting a second line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::product::Size;

/// A bare (product, size, quantity) line, as persisted and as sent over the
/// wire by cart mutation endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub size: Size,
    pub qty: i32,
}

/// A cart line enriched with the display data a client needs (name and the
/// unit price observed when the item was added).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub size: Size,
    pub qty: i32,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.qty)
    }

    pub fn line(&self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            size: self.size,
            qty: self.qty,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.qty).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.qty < 1 {
            return Err(CartError::InvalidQuantity);
        }
        match self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id && i.size == item.size)
        {
            Some(existing) => existing.qty += item.qty,
            None => self.items.push(item),
        }
        Ok(())
    }

    pub fn update_qty(&mut self, product_id: Uuid, size: Size, qty: i32) -> Result<(), CartError> {
        if qty < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.size == size)
            .ok_or(CartError::ItemNotFound)?;
        item.qty = qty;
        Ok(())
    }

    /// Removing a pair that is not present is a no-op.
    pub fn remove(&mut self, product_id: Uuid, size: Size) {
        self.items
            .retain(|i| !(i.product_id == product_id && i.size == size));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Union by (product, size), summing quantities. Used once, at the
    /// guest-to-authenticated transition.
    pub fn merge(&mut self, other: Cart) -> Result<(), CartError> {
        for item in other.items {
            self.add(item)?;
        }
        Ok(())
    }
}
