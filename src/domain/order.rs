//! Orders and the cart-to-order conversion.
//!
//! `build_order` is the single conversion path shared by every storage
//! backend: stock validation, order-item snapshots, and the stock decrements
//! it emits all derive from the one product set passed in. Callers are
//! responsible for reading that set and applying the draft atomically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::cart::CartLine;
use super::product::{Product, Size};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(Error::Internal(format!("unknown order status: {other}"))),
        }
    }
}

/// A copy of the product data at purchase time. Never recomputed from the
/// catalog afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub size: Size,
    pub qty: i32,
    pub price: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated conversion ready to be applied: the order to persist plus the
/// per-product stock decrements that must land in the same atomic unit.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub order: Order,
    pub decrements: Vec<(Uuid, i32)>,
}

/// Converts cart lines into an order draft against one product snapshot.
///
/// Quantities for the same product are summed across sizes before the stock
/// check, so a cart cannot pass validation line-by-line while exceeding the
/// product's stock in aggregate.
pub fn build_order(user_id: Uuid, lines: &[(CartLine, Product)]) -> Result<OrderDraft, Error> {
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut decrements: Vec<(Uuid, i32)> = Vec::with_capacity(lines.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for (line, product) in lines {
        if line.qty < 1 {
            return Err(Error::Validation("Quantity must be at least 1".to_string()));
        }
        items.push(OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            size: line.size,
            qty: line.qty,
            price: product.price,
        });
        match index.get(&product.id) {
            Some(&i) => decrements[i].1 += line.qty,
            None => {
                index.insert(product.id, decrements.len());
                decrements.push((product.id, line.qty));
            }
        }
    }

    for (line, product) in lines {
        let requested = index
            .get(&line.product_id)
            .and_then(|&i| decrements.get(i))
            .map(|(_, qty)| *qty)
            .unwrap_or(line.qty);
        if product.stock < requested {
            return Err(Error::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
            });
        }
    }

    let total_price = items
        .iter()
        .map(|i| i.price * Decimal::from(i.qty))
        .sum();

    Ok(OrderDraft {
        order: Order {
            id: Uuid::new_v4(),
            order_number: order_number(),
            user_id,
            items,
            total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        },
        decrements,
    })
}

fn order_number() -> String {
    format!("ORD-{:08}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::product::Category;

    fn product(name: &str, price: Decimal, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: "test".into(),
            price,
            image: "https://example.com/p.jpg".into(),
            category: Category::Men,
            sizes: vec![Size::S, Size::M, Size::L],
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(product: &Product, size: Size, qty: i32) -> (CartLine, Product) {
        (
            CartLine {
                product_id: product.id,
                size,
                qty,
            },
            product.clone(),
        )
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(
            build_order(Uuid::new_v4(), &[]),
            Err(Error::EmptyCart)
        ));
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let p = product("Denim Jacket", Decimal::new(8999, 2), 2);
        let err = build_order(Uuid::new_v4(), &[line(&p, Size::M, 3)]).unwrap_err();
        match err {
            Error::InsufficientStock { name, available } => {
                assert_eq!(name, "Denim Jacket");
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stock_is_checked_across_sizes_of_one_product() {
        // 3 in stock, 2+2 requested across two sizes: each line alone fits,
        // the aggregate does not.
        let p = product("Black Hoodie", Decimal::new(4999, 2), 3);
        let err = build_order(
            Uuid::new_v4(),
            &[line(&p, Size::M, 2), line(&p, Size::L, 2)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { available: 3, .. }));
    }

    #[test]
    fn total_is_the_sum_of_snapshot_prices() {
        let user = Uuid::new_v4();
        let a = product("Classic White T-Shirt", Decimal::new(1999, 2), 50);
        let b = product("Slim Fit Jeans", Decimal::new(6999, 2), 35);
        let draft =
            build_order(user, &[line(&a, Size::M, 2), line(&b, Size::L, 1)]).unwrap();

        assert_eq!(draft.order.user_id, user);
        assert_eq!(draft.order.status, OrderStatus::Pending);
        assert_eq!(draft.order.items.len(), 2);
        // 2 * 19.99 + 69.99
        assert_eq!(draft.order.total_price, Decimal::new(10997, 2));
        assert_eq!(draft.decrements, vec![(a.id, 2), (b.id, 1)]);
    }

    #[test]
    fn item_prices_are_copies_of_the_snapshot() {
        let p = product("Wool Scarf", Decimal::new(2999, 2), 30);
        let draft = build_order(Uuid::new_v4(), &[line(&p, Size::S, 1)]).unwrap();
        let item = &draft.order.items[0];
        assert_eq!(item.name, "Wool Scarf");
        assert_eq!(item.price, Decimal::new(2999, 2));
        assert_eq!(item.product_id, p.id);
    }

    #[test]
    fn decrements_merge_sizes_of_the_same_product() {
        let p = product("Polo Shirt", Decimal::new(3499, 2), 10);
        let draft = build_order(
            Uuid::new_v4(),
            &[line(&p, Size::M, 2), line(&p, Size::L, 3)],
        )
        .unwrap();
        assert_eq!(draft.decrements, vec![(p.id, 5)]);
        assert_eq!(draft.order.items.len(), 2);
    }
}
