//! Cart-to-order conversion entry point.
//!
//! The atomic conversion itself is the store's contract (`OrderStore::
//! checkout`); this layer attaches the requester's display fields to the
//! response and hands the confirmation to the notifier on a detached task.
//! Notification failure is logged and never affects the committed order.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::order::Order;
use crate::error::Result;
use crate::identity::Identity;
use crate::notify::{Notifier, Recipient};
use crate::store::Store;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.user_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
        }
    }
}

/// The checkout response: the created order plus who placed it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    #[serde(flatten)]
    pub order: Order,
    pub user: UserSummary,
}

pub async fn place_order(
    store: &dyn Store,
    notifier: Option<Arc<dyn Notifier>>,
    identity: &Identity,
) -> Result<OrderReceipt> {
    let order = store.checkout(identity.user_id).await?;
    tracing::info!(
        order_id = %order.id,
        user_id = %identity.user_id,
        total = %order.total_price,
        "order placed"
    );

    if let Some(notifier) = notifier {
        let order = order.clone();
        let recipient = Recipient {
            name: identity.name.clone(),
            email: identity.email.clone(),
        };
        tokio::spawn(async move {
            if let Err(err) = notifier.order_confirmation(&order, &recipient).await {
                tracing::warn!(order_id = %order.id, error = %err, "order confirmation failed");
            }
        });
    }

    Ok(OrderReceipt {
        order,
        user: UserSummary::from(identity),
    })
}
