//! Storage backends.
//!
//! Three store traits, one per aggregate, with a Postgres implementation for
//! production and an in-process one for tests. Checkout serialization is part
//! of the `OrderStore` contract: two concurrent checkouts for the same user
//! must never both convert the same cart.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, CartLine};
use crate::domain::catalog::{CatalogFilter, Page};
use crate::domain::order::Order;
use crate::domain::product::{Category, NewProduct, Product, Size};
use crate::error::Result;

/// A user's cart with each line joined against current product data, the
/// shape every cart endpoint returns.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: Uuid,
    pub items: Vec<CartEntry>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product: Product,
    pub size: Size,
    pub qty: i32,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|e| e.product.price * Decimal::from(e.qty))
            .sum()
    }
}

impl From<CartView> for Cart {
    fn from(view: CartView) -> Self {
        Cart::from_items(
            view.items
                .into_iter()
                .map(|e| CartItem {
                    product_id: e.product.id,
                    name: e.product.name,
                    size: e.size,
                    qty: e.qty,
                    unit_price: e.product.price,
                })
                .collect(),
        )
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Filtered, paginated listing, newest first.
    async fn list_products(&self, filter: &CatalogFilter) -> Result<Page<Product>>;

    async fn get_product(&self, id: Uuid) -> Result<Product>;

    /// Categories present in the catalog, in canonical order.
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Sizes present in the catalog, in canonical order.
    async fn sizes(&self) -> Result<Vec<Size>>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Empties the catalog along with the carts referencing it. Seeding and
    /// test helper.
    async fn clear_products(&self) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fetches the user's cart, creating an empty one on first access.
    async fn cart(&self, user_id: Uuid) -> Result<CartView>;

    /// Validates the product and size, then merges into an existing
    /// (product, size) line or appends a new one.
    async fn add_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView>;

    async fn update_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView>;

    /// Removing a pair that is not in the cart is a no-op success.
    async fn remove_item(&self, user_id: Uuid, product_id: Uuid, size: Size) -> Result<CartView>;

    async fn clear_cart(&self, user_id: Uuid) -> Result<()>;

    /// Guest-cart merge at login: union by (product, size), summing
    /// quantities. Every line is validated like an add; the first invalid
    /// line aborts the whole merge.
    async fn merge_cart(&self, user_id: Uuid, lines: &[CartLine]) -> Result<CartView>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Converts the user's cart into an order: validates stock against one
    /// product snapshot, persists the order items as copies of that snapshot,
    /// decrements stock, and empties the cart, all as a single atomic unit,
    /// serialized per user.
    async fn checkout(&self, user_id: Uuid) -> Result<Order>;

    /// The user's orders, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    async fn get_order(&self, id: Uuid) -> Result<Order>;
}

/// Umbrella trait for handler state.
pub trait Store: CatalogStore + CartStore + OrderStore {}

impl<T: CatalogStore + CartStore + OrderStore> Store for T {}
