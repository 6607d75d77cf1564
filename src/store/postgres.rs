//! Postgres store.
//!
//! Checkout runs in one transaction: the cart row is locked `FOR UPDATE`
//! first (serializing checkout per user), then the product rows are locked in
//! ascending id order so validation, order items, and decrements all observe
//! the same snapshot. The decrement itself carries a `stock >= qty` guard at
//! write time.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CartEntry, CartStore, CartView, CatalogStore, OrderStore};
use crate::domain::cart::CartLine;
use crate::domain::catalog::{CatalogFilter, Page};
use crate::domain::order::{build_order, Order, OrderItem, OrderStatus};
use crate::domain::product::{Category, NewProduct, Product, Size};
use crate::error::{Error, Result};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image, category, sizes, stock, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    image: String,
    category: String,
    sizes: Vec<String>,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(field: &str, value: &str) -> Error {
    Error::Internal(format!("unreadable {field} in stored row: {value}"))
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self> {
        let category: Category = row
            .category
            .parse()
            .map_err(|_| corrupt("category", &row.category))?;
        let sizes: Vec<Size> = row
            .sizes
            .iter()
            .map(|s| s.parse().map_err(|_| corrupt("size", s)))
            .collect::<Result<_>>()?;
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            category,
            sizes,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    size: String,
    qty: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: Uuid,
    size: String,
    qty: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = Error;

    fn try_from(row: CartLineRow) -> Result<Self> {
        Ok(CartLine {
            product_id: row.product_id,
            size: row.size.parse().map_err(|_| corrupt("size", &row.size))?,
            qty: row.qty,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        let status: OrderStatus = self.status.parse()?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items,
            total_price: self.total_price,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    size: String,
    qty: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = Error;

    fn try_from(row: OrderItemRow) -> Result<Self> {
        Ok(OrderItem {
            product_id: row.product_id,
            name: row.name,
            size: row.size.parse().map_err(|_| corrupt("size", &row.size))?,
            qty: row.qty,
            price: row.price,
        })
    }
}

async fn fetch_product<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(Error::NotFound("Product not found"))?
    .try_into()
}

/// Lazily creates the user's cart on first access.
async fn ensure_cart<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO carts (id, user_id) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE SET updated_at = now() RETURNING id",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

async fn upsert_line<'e>(executor: impl PgExecutor<'e>, cart_id: Uuid, line: CartLine) -> Result<()> {
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, size, qty) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (cart_id, product_id, size) \
         DO UPDATE SET qty = cart_items.qty + EXCLUDED.qty",
    )
    .bind(Uuid::now_v7())
    .bind(cart_id)
    .bind(line.product_id)
    .bind(line.size.as_str())
    .bind(line.qty)
    .execute(executor)
    .await?;
    Ok(())
}

fn validate_line(product: &Product, line: &CartLine) -> Result<()> {
    if line.qty < 1 {
        return Err(Error::Validation("Quantity must be at least 1".into()));
    }
    if !product.has_size(line.size) {
        return Err(Error::Validation(
            "Size not available for this product".into(),
        ));
    }
    Ok(())
}

impl PgStore {
    async fn load_cart(&self, user_id: Uuid) -> Result<CartView> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT ci.size, ci.qty, p.id, p.name, p.description, p.price, p.image, \
                    p.category, p.sizes, p.stock, p.created_at, p.updated_at \
             FROM cart_items ci \
             JOIN carts c ON c.id = ci.cart_id \
             JOIN products p ON p.id = ci.product_id \
             WHERE c.user_id = $1 \
             ORDER BY ci.created_at, ci.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(CartEntry {
                size: row.size.parse().map_err(|_| corrupt("size", &row.size))?,
                qty: row.qty,
                product: row.product.try_into()?,
            });
        }
        Ok(CartView { user_id, items })
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &CatalogFilter,
    category: Option<Category>,
    size: Option<Size>,
) {
    builder.push(" WHERE TRUE");
    if let Some(search) = filter.search() {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(size) = size {
        builder.push(" AND ").push_bind(size.as_str()).push(" = ANY(sizes)");
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, filter: &CatalogFilter) -> Result<Page<Product>> {
        let category = filter.category()?;
        let size = filter.size()?;
        filter.price_bounds()?;

        let mut query =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut query, filter, category, size);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());
        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, filter, category, size);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Product>>>()?;
        Ok(Page::new(items, total, filter.page(), filter.limit()))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product> {
        fetch_product(&self.pool, id).await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let present: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products")
                .fetch_all(&self.pool)
                .await?;
        Ok(Category::ALL
            .into_iter()
            .filter(|c| present.iter().any(|p| p == c.as_str()))
            .collect())
    }

    async fn sizes(&self) -> Result<Vec<Size>> {
        let present: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT unnest(sizes) FROM products")
                .fetch_all(&self.pool)
                .await?;
        Ok(Size::ALL
            .into_iter()
            .filter(|s| present.iter().any(|p| p == s.as_str()))
            .collect())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let sizes: Vec<String> = product.sizes.iter().map(|s| s.as_str().to_string()).collect();
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (id, name, description, price, image, category, sizes, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(product.category.as_str())
        .bind(&sizes)
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn clear_products(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cart_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM carts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart(&self, user_id: Uuid) -> Result<CartView> {
        ensure_cart(&self.pool, user_id).await?;
        self.load_cart(user_id).await
    }

    async fn add_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView> {
        let product = fetch_product(&self.pool, line.product_id).await?;
        validate_line(&product, &line)?;
        let cart_id = ensure_cart(&self.pool, user_id).await?;
        upsert_line(&self.pool, cart_id, line).await?;
        self.load_cart(user_id).await
    }

    async fn update_item(&self, user_id: Uuid, line: CartLine) -> Result<CartView> {
        if line.qty < 1 {
            return Err(Error::Validation("Quantity must be at least 1".into()));
        }
        let updated = sqlx::query(
            "UPDATE cart_items SET qty = $4 FROM carts \
             WHERE cart_items.cart_id = carts.id AND carts.user_id = $1 \
               AND cart_items.product_id = $2 AND cart_items.size = $3",
        )
        .bind(user_id)
        .bind(line.product_id)
        .bind(line.size.as_str())
        .bind(line.qty)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound("Item not found in cart"));
        }
        self.load_cart(user_id).await
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid, size: Size) -> Result<CartView> {
        sqlx::query(
            "DELETE FROM cart_items USING carts \
             WHERE cart_items.cart_id = carts.id AND carts.user_id = $1 \
               AND cart_items.product_id = $2 AND cart_items.size = $3",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(size.as_str())
        .execute(&self.pool)
        .await?;
        self.load_cart(user_id).await
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            "DELETE FROM cart_items USING carts \
             WHERE cart_items.cart_id = carts.id AND carts.user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn merge_cart(&self, user_id: Uuid, lines: &[CartLine]) -> Result<CartView> {
        let mut tx = self.pool.begin().await?;
        for line in lines {
            let product = fetch_product(&mut *tx, line.product_id).await?;
            validate_line(&product, line)?;
        }
        let cart_id = ensure_cart(&mut *tx, user_id).await?;
        for line in lines {
            upsert_line(&mut *tx, cart_id, *line).await?;
        }
        tx.commit().await?;
        self.load_cart(user_id).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn checkout(&self, user_id: Uuid) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Per-user serialization: the cart row lock is taken before anything
        // else, so a concurrent checkout for the same user waits here and
        // then sees the emptied cart.
        let cart_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(cart_id) = cart_id else {
            return Err(Error::EmptyCart);
        };

        let line_rows: Vec<CartLineRow> = sqlx::query_as(
            "SELECT product_id, size, qty FROM cart_items \
             WHERE cart_id = $1 ORDER BY created_at, id",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;
        if line_rows.is_empty() {
            return Err(Error::EmptyCart);
        }
        let lines = line_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<CartLine>>>()?;

        // One snapshot for validation, order items, and decrements.
        // Lock ordering: ascending product id.
        let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let product_rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        let products: HashMap<Uuid, Product> = product_rows
            .into_iter()
            .map(|row| {
                let product: Product = row.try_into()?;
                Ok((product.id, product))
            })
            .collect::<Result<_>>()?;

        let pairs: Vec<(CartLine, Product)> = lines
            .iter()
            .map(|line| {
                let product = products
                    .get(&line.product_id)
                    .cloned()
                    .ok_or(Error::NotFound("Product not found"))?;
                Ok((*line, product))
            })
            .collect::<Result<_>>()?;

        let draft = build_order(user_id, &pairs)?;
        let order = &draft.order;

        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, total_price, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.total_price)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, name, size, qty, price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.size.as_str())
            .bind(item.qty)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        for (product_id, qty) in &draft.decrements {
            let decremented = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = now() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(product_id)
            .bind(qty)
            .execute(&mut *tx)
            .await?;
            if decremented.rows_affected() == 0 {
                // Write-time guard; unreachable while the rows above are
                // locked, but the transaction must not commit without it.
                let (name, available) = products
                    .get(product_id)
                    .map(|p| (p.name.clone(), p.stock))
                    .unwrap_or_default();
                return Err(Error::InsufficientStock { name, available });
            }
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(draft.order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let order_rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT id, order_number, user_id, total_price, status, created_at \
             FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT oi.order_id, oi.product_id, oi.name, oi.size, oi.qty, oi.price \
             FROM order_items oi JOIN orders o ON o.id = oi.order_id \
             WHERE o.user_id = $1 ORDER BY oi.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row.try_into()?);
        }

        order_rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn get_order(&self, id: Uuid) -> Result<Order> {
        let row: OrderRow = sqlx::query_as(
            "SELECT id, order_number, user_id, total_price, status, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound("Order not found"))?;

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT order_id, product_id, name, size, qty, price \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let items = item_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<OrderItem>>>()?;

        row.into_order(items)
    }
}
