//! Order-confirmation dispatch.
//!
//! The mailer itself lives outside this service: the production notifier
//! renders the confirmation email and publishes it to a NATS subject the
//! mailer consumes. Delivery is best-effort by contract, so failures are for
//! the caller to log, never to retry or roll back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::order::Order;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_confirmation(&self, order: &Order, recipient: &Recipient) -> Result<()>;
}

pub struct NatsNotifier {
    client: async_nats::Client,
    subject: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client, subject: String) -> Self {
        Self { client, subject }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn order_confirmation(&self, order: &Order, recipient: &Recipient) -> Result<()> {
        let message = confirmation_email(order, recipient);
        let payload =
            serde_json::to_vec(&message).map_err(|e| Error::Notification(e.to_string()))?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;
        Ok(())
    }
}

pub fn confirmation_email(order: &Order, recipient: &Recipient) -> EmailMessage {
    let rows: String = order
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>${}</td></tr>",
                item.name, item.size, item.qty, item.price
            )
        })
        .collect();

    let html = format!(
        "<h1>Thank you for your order!</h1>\
         <p><strong>Order:</strong> {number}</p>\
         <p><strong>Date:</strong> {date}</p>\
         <p><strong>Status:</strong> {status}</p>\
         <table>\
         <thead><tr><th>Product</th><th>Size</th><th>Quantity</th><th>Price</th></tr></thead>\
         <tbody>{rows}</tbody>\
         </table>\
         <h2>Total: ${total}</h2>\
         <p>We'll send you another email when your order ships.</p>",
        number = order.order_number,
        date = order.created_at.format("%Y-%m-%d"),
        status = order.status,
        total = order.total_price,
    );

    EmailMessage {
        to: recipient.email.clone(),
        subject: format!("Order Confirmation - #{}", order.order_number),
        html,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::domain::order::{OrderItem, OrderStatus};
    use crate::domain::product::Size;

    #[test]
    fn confirmation_lists_items_and_total() {
        let order = Order {
            id: Uuid::new_v4(),
            order_number: "ORD-00000042".into(),
            user_id: Uuid::new_v4(),
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                name: "Denim Jacket".into(),
                size: Size::M,
                qty: 2,
                price: Decimal::new(8999, 2),
            }],
            total_price: Decimal::new(17998, 2),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let recipient = Recipient {
            name: "Ada".into(),
            email: "ada@example.com".into(),
        };

        let message = confirmation_email(&order, &recipient);
        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Order Confirmation - #ORD-00000042");
        assert!(message.html.contains("Denim Jacket"));
        assert!(message.html.contains("$89.99"));
        assert!(message.html.contains("Total: $179.98"));
        assert!(message.html.contains("pending"));
    }
}
