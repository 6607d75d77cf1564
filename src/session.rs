//! Client-side cart session.
//!
//! One cart abstraction polymorphic over its storage: a guest session keeps
//! items in process with price data captured at add time; an authenticated
//! session delegates every operation to the server cart store. The guest cart
//! is merged into the server cart exactly once, at the moment the session
//! authenticates, and logout tears the session down to a fresh guest.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, CartLine};
use crate::domain::product::{Product, Size};
use crate::error::Result;
use crate::identity::Identity;
use crate::store::CartStore;

#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn snapshot(&self) -> Result<Cart>;
    async fn add(&self, product: &Product, size: Size, qty: i32) -> Result<()>;
    async fn update(&self, product_id: Uuid, size: Size, qty: i32) -> Result<()>;
    async fn remove(&self, product_id: Uuid, size: Size) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Guest cart: local only, no server durability.
#[derive(Default)]
struct LocalBackend {
    cart: Mutex<Cart>,
}

#[async_trait]
impl CartBackend for LocalBackend {
    async fn snapshot(&self) -> Result<Cart> {
        Ok(self.cart.lock().await.clone())
    }

    async fn add(&self, product: &Product, size: Size, qty: i32) -> Result<()> {
        let mut cart = self.cart.lock().await;
        cart.add(CartItem {
            product_id: product.id,
            name: product.name.clone(),
            size,
            qty,
            unit_price: product.price,
        })?;
        Ok(())
    }

    async fn update(&self, product_id: Uuid, size: Size, qty: i32) -> Result<()> {
        let mut cart = self.cart.lock().await;
        cart.update_qty(product_id, size, qty)?;
        Ok(())
    }

    async fn remove(&self, product_id: Uuid, size: Size) -> Result<()> {
        self.cart.lock().await.remove(product_id, size);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cart.lock().await.clear();
        Ok(())
    }
}

/// Authenticated cart: the server copy is authoritative.
struct RemoteBackend {
    store: Arc<dyn CartStore>,
    user_id: Uuid,
}

#[async_trait]
impl CartBackend for RemoteBackend {
    async fn snapshot(&self) -> Result<Cart> {
        Ok(self.store.cart(self.user_id).await?.into())
    }

    async fn add(&self, product: &Product, size: Size, qty: i32) -> Result<()> {
        self.store
            .add_item(
                self.user_id,
                CartLine {
                    product_id: product.id,
                    size,
                    qty,
                },
            )
            .await?;
        Ok(())
    }

    async fn update(&self, product_id: Uuid, size: Size, qty: i32) -> Result<()> {
        self.store
            .update_item(
                self.user_id,
                CartLine {
                    product_id,
                    size,
                    qty,
                },
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, product_id: Uuid, size: Size) -> Result<()> {
        self.store.remove_item(self.user_id, product_id, size).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear_cart(self.user_id).await
    }
}

pub struct CartSession {
    backend: Box<dyn CartBackend>,
    authenticated: bool,
}

impl CartSession {
    /// Starts an unauthenticated session with an empty local cart.
    pub fn guest() -> Self {
        Self {
            backend: Box::new(LocalBackend::default()),
            authenticated: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Switches the session to the server cart, merging the guest cart into
    /// it (union by (product, size), summing quantities). The merge happens
    /// exactly once, here; afterwards the server copy is preferred.
    pub async fn authenticate(
        self,
        store: Arc<dyn CartStore>,
        identity: &Identity,
    ) -> Result<Self> {
        let guest = self.backend.snapshot().await?;
        let lines: Vec<CartLine> = guest.items().iter().map(CartItem::line).collect();
        if lines.is_empty() {
            store.cart(identity.user_id).await?;
        } else {
            store.merge_cart(identity.user_id, &lines).await?;
        }
        Ok(Self {
            backend: Box::new(RemoteBackend {
                store,
                user_id: identity.user_id,
            }),
            authenticated: true,
        })
    }

    /// Tears the session down to a fresh guest cart.
    pub fn logout(self) -> Self {
        Self::guest()
    }

    pub async fn items(&self) -> Result<Cart> {
        self.backend.snapshot().await
    }

    pub async fn add(&self, product: &Product, size: Size, qty: i32) -> Result<()> {
        self.backend.add(product, size, qty).await
    }

    pub async fn update(&self, product_id: Uuid, size: Size, qty: i32) -> Result<()> {
        self.backend.update(product_id, size, qty).await
    }

    pub async fn remove(&self, product_id: Uuid, size: Size) -> Result<()> {
        self.backend.remove(product_id, size).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn total(&self) -> Result<Decimal> {
        Ok(self.items().await?.subtotal())
    }

    pub async fn item_count(&self) -> Result<i32> {
        Ok(self.items().await?.item_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use crate::store::memory::MemoryStore;
    use crate::store::CatalogStore;

    async fn seeded() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for product in seed::demo_products() {
            store.insert_product(product).await.unwrap();
        }
        Arc::new(store)
    }

    async fn product_named(store: &MemoryStore, name: &str) -> Product {
        store
            .list_products(&crate::domain::catalog::CatalogFilter {
                search: Some(name.to_string()),
                limit: Some(100),
                ..Default::default()
            })
            .await
            .unwrap()
            .items
            .into_iter()
            .find(|p| p.name == name)
            .expect("seeded product")
    }

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[tokio::test]
    async fn guest_cart_tracks_items_and_totals() {
        let store = seeded().await;
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        let session = CartSession::guest();
        session.add(&shirt, Size::M, 2).await.unwrap();
        session.add(&shirt, Size::M, 1).await.unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(session.item_count().await.unwrap(), 3);
        // 3 * 19.99
        assert_eq!(session.total().await.unwrap(), Decimal::new(5997, 2));
    }

    #[tokio::test]
    async fn login_merges_the_guest_cart_into_the_server_cart() {
        let store = seeded().await;
        let identity = identity();
        let shirt = product_named(&store, "Classic White T-Shirt").await;
        let jeans = product_named(&store, "Slim Fit Jeans").await;

        // Items already in the server cart from a previous session.
        store
            .add_item(
                identity.user_id,
                CartLine {
                    product_id: shirt.id,
                    size: Size::M,
                    qty: 1,
                },
            )
            .await
            .unwrap();

        let session = CartSession::guest();
        session.add(&shirt, Size::M, 2).await.unwrap();
        session.add(&jeans, Size::W32, 1).await.unwrap();

        let session = session
            .authenticate(store.clone(), &identity)
            .await
            .unwrap();
        assert!(session.is_authenticated());

        let cart = session.items().await.unwrap();
        assert_eq!(cart.items().len(), 2);
        // Overlapping (product, size) summed: 1 on the server + 2 from guest.
        let merged = cart
            .items()
            .iter()
            .find(|i| i.product_id == shirt.id)
            .unwrap();
        assert_eq!(merged.qty, 3);
    }

    #[tokio::test]
    async fn empty_guest_cart_prefers_the_server_cart() {
        let store = seeded().await;
        let identity = identity();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        store
            .add_item(
                identity.user_id,
                CartLine {
                    product_id: shirt.id,
                    size: Size::L,
                    qty: 4,
                },
            )
            .await
            .unwrap();

        let session = CartSession::guest()
            .authenticate(store.clone(), &identity)
            .await
            .unwrap();
        assert_eq!(session.item_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn authenticated_mutations_hit_the_server_cart() {
        let store = seeded().await;
        let identity = identity();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        let session = CartSession::guest()
            .authenticate(store.clone(), &identity)
            .await
            .unwrap();
        session.add(&shirt, Size::M, 2).await.unwrap();
        session.update(shirt.id, Size::M, 5).await.unwrap();

        let server_view = store.cart(identity.user_id).await.unwrap();
        assert_eq!(server_view.items[0].qty, 5);

        session.remove(shirt.id, Size::M).await.unwrap();
        assert!(store.cart(identity.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_resets_to_an_empty_guest_cart() {
        let store = seeded().await;
        let identity = identity();
        let shirt = product_named(&store, "Classic White T-Shirt").await;

        let session = CartSession::guest()
            .authenticate(store.clone(), &identity)
            .await
            .unwrap();
        session.add(&shirt, Size::M, 2).await.unwrap();

        let session = session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.item_count().await.unwrap(), 0);
        // The server cart survives for the next login.
        assert_eq!(store.cart(identity.user_id).await.unwrap().items.len(), 1);
    }
}
