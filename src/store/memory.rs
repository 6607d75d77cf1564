//! In-process store.
//!
//! Backs the test suite. One mutex over the whole state makes every
//! operation atomic and gives checkout its per-user serialization: a
//! double-submit runs the second conversion after the first has emptied the
//! cart, so it fails with `EmptyCart` instead of producing a second order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CartEntry, CartStore, CartView, CatalogStore, OrderStore};
use crate::domain::cart::CartLine;
use crate::domain::catalog::{CatalogFilter, Page};
use crate::domain::order::{build_order, Order};
use crate::domain::product::{Category, NewProduct, Product, Size};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Insertion order doubles as creation order; listings iterate newest
    /// first by reversing.
    products: Vec<Product>,
    carts: HashMap<Uuid, Vec<CartLine>>,
    orders: Vec<Order>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn product(&self, id: Uuid) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .ok_or(Error::NotFound("Product not found"))
    }

    fn product_mut(&mut self, id: Uuid) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::NotFound("Product not found"))
    }

    fn view(&self, user_id: Uuid) -> Result<CartView> {
        let lines = self.carts.get(&user_id).cloned().unwrap_or_default();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(CartEntry {
                product: self.product(line.product_id)?.clone(),
                size: line.size,
                qty: line.qty,
            });
        }
        Ok(CartView { user_id, items })
    }

    fn validate_line(&self, line: &CartLine) -> Result<()> {
        if line.qty < 1 {
            return Err(Error::Validation("Quantity must be at least 1".into()));
        }
        let product = self.product(line.product_id)?;
        if !product.has_size(line.size) {
            return Err(Error::Validation(
                "Size not available for this product".into(),
            ));
        }
        Ok(())
    }

    fn upsert_line(&mut self, user_id: Uuid, line: CartLine) {
        let lines = self.carts.entry(user_id).or_default();
        match lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.size == line.size)
        {
            Some(existing) => existing.qty += line.qty,
            None => lines.push(line),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: &CatalogFilter) -> Result<Page<Product>> {
        let state = self.state.lock().await;
        let category = filter.category()?;
        let size = filter.size()?;
        filter.price_bounds()?;
        let needle = filter.search().map(str::to_lowercase);

        let matching: Vec<Product> = state
            .products
            .iter()
            .rev()
            .filter(|p| {
                needle.as_deref().map_or(true, |n| {
                    p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                }) && category.map_or(true, |c| p.category == c)
                    && size.map_or(true, |s| p.has_size(s))
                    && filter.min_price.map_or(true, |min| p.price >= min)
                    && filter.max_price.map_or(true, |max| p.price <= max)
            })
            .cloned()
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect();
        Ok(Page::new(items, total, filter.page(), filter.limit()))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product> {
        let state = self.state.lock().await;
        state.product(id).cloned()
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        Ok(Category::ALL
            .into_iter()
            .filter(|c| state.products.iter().any(|p| p.category == *c))
            .collect())
    }

    async fn sizes(&self) -> Result<Vec<Size>> {
        let state = self.state.lock().await;
        Ok(Size::ALL
            .into_iter()
            .filter(|s| state.products.iter().any(|p| p.has_size(*s)))
            .collect())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            name: product.name,
            description: product.description,
            price: product.price,
            image: product.image,
            category: product.category,
            sizes: product.sizes,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn clear_products(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.products.clear();
        state.carts.clear();
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart(&self, user_id: Uuid) -> Result<CartView> {
        let mut state = self.state.lock().await;
        state.carts.entry(user_id).or_default();
        state.view(user_id)
    }

    async fn add_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView> {
        let mut state = self.state.lock().await;
        state.validate_line(&line)?;
        state.upsert_line(user_id, line);
        state.view(user_id)
    }

    async fn update_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView> {
        let mut state = self.state.lock().await;
        if line.qty < 1 {
            return Err(Error::Validation("Quantity must be at least 1".into()));
        }
        let existing = state
            .carts
            .get_mut(&user_id)
            .and_then(|lines| {
                lines
                    .iter_mut()
                    .find(|l| l.product_id == line.product_id && l.size == line.size)
            })
            .ok_or(Error::NotFound("Item not found in cart"))?;
        existing.qty = line.qty;
        state.view(user_id)
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid, size: Size) -> Result<CartView> {
        let mut state = self.state.lock().await;
        if let Some(lines) = state.carts.get_mut(&user_id) {
            lines.retain(|l| !(l.product_id == product_id && l.size == size));
        }
        state.view(user_id)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.carts.insert(user_id, Vec::new());
        Ok(())
    }

    async fn merge_cart(&self, user_id: Uuid, lines: &[CartLine]) -> Result<CartView> {
        let mut state = self.state.lock().await;
        for line in lines {
            state.validate_line(line)?;
        }
        for line in lines {
            state.upsert_line(user_id, *line);
        }
        state.view(user_id)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn checkout(&self, user_id: Uuid) -> Result<Order> {
        let mut state = self.state.lock().await;

        let lines = state.carts.get(&user_id).cloned().unwrap_or_default();
        if lines.is_empty() {
            return Err(Error::EmptyCart);
        }

        // The snapshot used for validation, order items, and decrements.
        let pairs: Vec<(CartLine, Product)> = lines
            .iter()
            .map(|line| Ok((*line, state.product(line.product_id)?.clone())))
            .collect::<Result<_>>()?;

        let draft = build_order(user_id, &pairs)?;

        for (product_id, qty) in &draft.decrements {
            state.product_mut(*product_id)?.stock -= qty;
        }
        state.orders.push(draft.order.clone());
        state.carts.insert(user_id, Vec::new());

        Ok(draft.order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: Uuid) -> Result<Order> {
        let state = self.state.lock().await;
        state
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(Error::NotFound("Order not found"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::*;
    use crate::seed;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for product in seed::demo_products() {
            store.insert_product(product).await.unwrap();
        }
        store
    }

    async fn product_named(store: &MemoryStore, name: &str) -> Product {
        let page = store
            .list_products(&CatalogFilter {
                search: Some(name.to_string()),
                limit: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        page.items
            .into_iter()
            .find(|p| p.name == name)
            .expect("seeded product")
    }

    #[tokio::test]
    async fn add_creates_one_line_then_merges_duplicates() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        let view = store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].qty, 2);

        let view = store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].qty, 5);
    }

    #[tokio::test]
    async fn add_rejects_unknown_product_and_bad_size() {
        let store = seeded().await;
        let user = Uuid::new_v4();

        let err = store
            .add_item(
                user,
                CartLine {
                    product_id: Uuid::new_v4(),
                    size: Size::M,
                    qty: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Baseball Cap is one-size only.
        let cap = product_named(&store, "Baseball Cap").await;
        let err = store
            .add_item(
                user,
                CartLine {
                    product_id: cap.id,
                    size: Size::M,
                    qty: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn remove_of_absent_pair_is_a_noop() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 1,
                },
            )
            .await
            .unwrap();
        let view = store.remove_item(user, shirt.id, Size::L).await.unwrap();
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test]
    async fn price_filter_and_pagination_metadata() {
        let store = seeded().await;

        let page = store
            .list_products(&CatalogFilter {
                min_price: Some(Decimal::new(20, 0)),
                max_price: Some(Decimal::new(50, 0)),
                limit: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!page.items.is_empty());
        for product in &page.items {
            assert!(product.price >= Decimal::new(20, 0));
            assert!(product.price <= Decimal::new(50, 0));
        }

        // 21 seeded products, limit 10.
        let page = store
            .list_products(&CatalogFilter::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 21);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(!page.has_prev_page);
        // Newest first: the last-seeded product leads page one.
        assert_eq!(page.items[0].name, "Wrist Watch");
    }

    #[tokio::test]
    async fn facets_report_only_present_values() {
        let store = seeded().await;
        assert_eq!(store.categories().await.unwrap(), Category::ALL.to_vec());
        let sizes = store.sizes().await.unwrap();
        assert!(sizes.contains(&Size::Os));
        assert!(sizes.contains(&Size::W32));
    }

    #[tokio::test]
    async fn checkout_converts_cart_and_decrements_stock() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;
        let jeans = product_named(&store, "Slim Fit Jeans").await;

        store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 2,
                },
            )
            .await
            .unwrap();
        store
            .add_item(
                user,
                CartLine {
                    product_id: jeans.id,
                    size: Size::W32,
                    qty: 1,
                },
            )
            .await
            .unwrap();

        let order = store.checkout(user).await.unwrap();
        // 2 * 19.99 + 69.99
        assert_eq!(order.total_price, Decimal::new(10997, 2));
        assert_eq!(order.items.len(), 2);

        assert_eq!(
            store.get_product(shirt.id).await.unwrap().stock,
            shirt.stock - 2
        );
        assert_eq!(
            store.get_product(jeans.id).await.unwrap().stock,
            jeans.stock - 1
        );
        assert!(store.cart(user).await.unwrap().is_empty());
        assert_eq!(store.orders_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_checkout_leaves_everything_unchanged() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let blazer = product_named(&store, "Women's Blazer").await;

        store
            .add_item(
                user,
                CartLine {
                    product_id: blazer.id,
                    size: Size::M,
                    qty: blazer.stock + 1,
                },
            )
            .await
            .unwrap();

        let err = store.checkout(user).await.unwrap_err();
        match err {
            Error::InsufficientStock { name, available } => {
                assert_eq!(name, "Women's Blazer");
                assert_eq!(available, blazer.stock);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(
            store.get_product(blazer.id).await.unwrap().stock,
            blazer.stock
        );
        assert_eq!(store.cart(user).await.unwrap().items.len(), 1);
        assert!(store.orders_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_on_empty_cart_fails() {
        let store = seeded().await;
        let err = store.checkout(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyCart));
    }

    #[tokio::test]
    async fn concurrent_checkouts_create_exactly_one_order() {
        let store = Arc::new(seeded().await);
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 3,
                },
            )
            .await
            .unwrap();

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.checkout(user).await }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.checkout(user).await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // One side wins, the other observes the emptied cart.
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert!(matches!(
            a.err().or(b.err()).unwrap(),
            Error::EmptyCart
        ));
        assert_eq!(store.orders_for_user(user).await.unwrap().len(), 1);
        assert_eq!(
            store.get_product(shirt.id).await.unwrap().stock,
            shirt.stock - 3
        );
    }

    #[tokio::test]
    async fn merge_sums_overlapping_lines_or_aborts_wholesale() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        store
            .add_item(
                user,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 2,
                },
            )
            .await
            .unwrap();

        let guest = [
            CartLine {
                product_id: shirt.id,
                size: Size::M,
                qty: 1,
            },
            CartLine {
                product_id: shirt.id,
                size: Size::L,
                qty: 1,
            },
        ];
        let view = store.merge_cart(user, &guest).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].qty, 3);

        // A single invalid line aborts the merge without partial effects.
        let bad = [
            CartLine {
                product_id: shirt.id,
                size: Size::M,
                qty: 1,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                size: Size::M,
                qty: 1,
            },
        ];
        assert!(store.merge_cart(user, &bad).await.is_err());
        let view = store.cart(user).await.unwrap();
        assert_eq!(view.items[0].qty, 3);
    }

    #[tokio::test]
    async fn orders_list_newest_first() {
        let store = seeded().await;
        let user = Uuid::new_v4();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        for _ in 0..2 {
            store
                .add_item(
                    user,
                    CartLine {
                        product_id: shirt.id,
                        size: Size::M,
                        qty: 1,
                    },
                )
                .await
                .unwrap();
            store.checkout(user).await.unwrap();
        }

        let orders = store.orders_for_user(user).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].created_at >= orders[1].created_at);
    }
}
