//! Orders created by finalizing a paid checkout session.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use threadline_core::{Email, OrderId, OrderStatus, UserId};

use super::cart::LineItem;
use super::checkout::{Checkout, ShippingAddress};

/// A finalized order. Carries a copy of everything from the checkout
/// session so it stays self-contained after the session is sealed.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_status: String,
    pub payment_details: Option<serde_json::Value>,
    pub status: OrderStatus,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build an order from a paid checkout session. The caller is
    /// responsible for having verified the session state; payment fields are
    /// copied as-is.
    #[must_use]
    pub fn from_checkout(checkout: &Checkout, now: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::generate(),
            user: checkout.user,
            items: checkout.items.clone(),
            shipping_address: checkout.shipping_address.clone(),
            payment_method: checkout.payment_method.clone(),
            total_price: checkout.total_price,
            is_paid: checkout.state.is_paid(),
            paid_at: checkout.state.paid_at(),
            payment_status: checkout.state.payment_status().to_owned(),
            payment_details: checkout.state.payment_details().cloned(),
            status: OrderStatus::default(),
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the fulfillment status, stamping the delivery fields when the
    /// new status is `Delivered` and clearing them otherwise.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        if status.is_delivered() {
            self.is_delivered = true;
            self.delivered_at = Some(now);
        } else {
            self.is_delivered = false;
            self.delivered_at = None;
        }
        self.updated_at = now;
    }
}

/// Name and email of the order's owner, joined in for admin and detail
/// views.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub name: String,
    pub email: Email,
}

/// Wire representation of an order. `user` is either the bare ID or an
/// owner summary depending on whether the view was populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user: OrderOwner,
    pub order_items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
    pub payment_status: String,
    pub is_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    pub status: OrderStatus,
    pub is_delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OrderOwner {
    Id(UserId),
    Populated(OwnerSummary),
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order) -> Self {
        Self::build(order, OrderOwner::Id(order.user))
    }

    /// View with the owner's name and email joined in.
    #[must_use]
    pub fn populated(order: &Order, owner: OwnerSummary) -> Self {
        Self::build(order, OrderOwner::Populated(owner))
    }

    fn build(order: &Order, user: OrderOwner) -> Self {
        Self {
            id: order.id,
            user,
            order_items: order.items.clone(),
            shipping_address: order.shipping_address.clone(),
            payment_method: order.payment_method.clone(),
            total_price: order.total_price,
            payment_status: order.payment_status.clone(),
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            payment_details: order.payment_details.clone(),
            status: order.status,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkout::CheckoutState;
    use threadline_core::CheckoutId;

    fn paid_checkout() -> Checkout {
        let now = Utc::now();
        Checkout {
            id: CheckoutId::generate(),
            user: UserId::generate(),
            items: Vec::new(),
            shipping_address: ShippingAddress {
                address: "1 Main St".to_owned(),
                city: "Springfield".to_owned(),
                postal_code: "12345".to_owned(),
                country: "US".to_owned(),
            },
            payment_method: "card".to_owned(),
            total_price: Decimal::ZERO,
            state: CheckoutState::Pending
                .pay(Some(serde_json::json!({"txn": "abc"})), now)
                .expect("pay"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_from_checkout_copies_payment() {
        let checkout = paid_checkout();
        let order = Order::from_checkout(&checkout, Utc::now());

        assert!(order.is_paid);
        assert_eq!(order.payment_status, "paid");
        assert_eq!(
            order.payment_details,
            Some(serde_json::json!({"txn": "abc"}))
        );
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(!order.is_delivered);
    }

    #[test]
    fn test_delivered_stamps_timestamp() {
        let checkout = paid_checkout();
        let mut order = Order::from_checkout(&checkout, Utc::now());

        order.set_status(OrderStatus::Delivered, Utc::now());
        assert!(order.is_delivered);
        assert!(order.delivered_at.is_some());

        order.set_status(OrderStatus::Shipped, Utc::now());
        assert!(!order.is_delivered);
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn test_populated_view_embeds_owner() {
        let checkout = paid_checkout();
        let order = Order::from_checkout(&checkout, Utc::now());
        let owner = OwnerSummary {
            name: "Ada".to_owned(),
            email: Email::parse("ada@example.com").expect("email"),
        };

        let json = serde_json::to_value(OrderView::populated(&order, owner)).expect("serialize");
        assert_eq!(json["user"]["name"], "Ada");
        assert_eq!(json["user"]["email"], "ada@example.com");
        assert_eq!(json["status"], "Processing");
    }
}
