//! Checkout session domain types.
//!
//! A checkout session snapshots cart items at creation time and then walks a
//! strictly one-way state machine:
//!
//! ```text
//! Pending -> Paid -> Finalized
//! ```
//!
//! The state is an explicit enum rather than a pair of booleans, so
//! "finalized but unpaid" is unrepresentable. Wire serialization still
//! exposes the flat `paymentStatus`/`isPaid`/`isFinalized` shape the public
//! API contract uses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::{CheckoutId, UserId};

use super::cart::LineItem;

/// Client-supplied shipping destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// The wire value a payment confirmation must carry, verbatim and
/// case-sensitive, for the session to transition to paid.
pub const PAID_STATUS: &str = "paid";

/// Attempted transition was illegal for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The session has already been finalized; nothing may change anymore.
    #[error("checkout already finalized")]
    AlreadyFinalized,
    /// Finalize was attempted before payment was confirmed.
    #[error("checkout is not paid")]
    NotPaid,
}

/// Payment/finalization state of a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    /// Created, awaiting payment confirmation.
    Pending,
    /// Payment confirmed by the external collaborator.
    Paid {
        /// Opaque payload from the payment provider.
        payment_details: Option<serde_json::Value>,
        /// When the paid transition happened.
        paid_at: DateTime<Utc>,
    },
    /// Converted into an order; terminal.
    Finalized {
        payment_details: Option<serde_json::Value>,
        paid_at: DateTime<Utc>,
        finalized_at: DateTime<Utc>,
    },
}

impl CheckoutState {
    /// Record a payment confirmation.
    ///
    /// Re-confirming an already-paid session overwrites the payment payload
    /// (providers retry); a finalized session rejects the update.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::AlreadyFinalized`] when the session is
    /// already finalized.
    pub fn pay(
        self,
        payment_details: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match self {
            Self::Finalized { .. } => Err(TransitionError::AlreadyFinalized),
            Self::Pending | Self::Paid { .. } => Ok(Self::Paid {
                payment_details,
                paid_at: at,
            }),
        }
    }

    /// Seal the session after order creation.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPaid`] from `Pending` and
    /// [`TransitionError::AlreadyFinalized`] from `Finalized`.
    pub fn finalize(self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Err(TransitionError::NotPaid),
            Self::Finalized { .. } => Err(TransitionError::AlreadyFinalized),
            Self::Paid {
                payment_details,
                paid_at,
            } => Ok(Self::Finalized {
                payment_details,
                paid_at,
                finalized_at: at,
            }),
        }
    }

    /// Payment status string as exposed on the wire.
    #[must_use]
    pub const fn payment_status(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid { .. } | Self::Finalized { .. } => PAID_STATUS,
        }
    }

    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid { .. } | Self::Finalized { .. })
    }

    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized { .. })
    }

    #[must_use]
    pub const fn paid_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Paid { paid_at, .. } | Self::Finalized { paid_at, .. } => Some(*paid_at),
        }
    }

    #[must_use]
    pub const fn finalized_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Finalized { finalized_at, .. } => Some(*finalized_at),
            _ => None,
        }
    }

    #[must_use]
    pub const fn payment_details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Pending => None,
            Self::Paid {
                payment_details, ..
            }
            | Self::Finalized {
                payment_details, ..
            } => payment_details.as_ref(),
        }
    }
}

/// A checkout session.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Unique session ID.
    pub id: CheckoutId,
    /// Owning user; checkout requires authentication.
    pub user: UserId,
    /// Immutable snapshot of cart line items at creation time.
    pub items: Vec<LineItem>,
    /// Client-supplied destination.
    pub shipping_address: ShippingAddress,
    /// Client-supplied payment method label.
    pub payment_method: String,
    /// Client-supplied total. Not recomputed server-side; mismatches against
    /// the item sum are logged, not rejected.
    pub total_price: Decimal,
    /// Payment/finalization state.
    pub state: CheckoutState,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl Checkout {
    /// Sum of `price * quantity` over the snapshot, for mismatch logging.
    #[must_use]
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

/// Wire representation of a checkout session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub id: CheckoutId,
    pub user: UserId,
    pub checkout_items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
    pub payment_status: String,
    pub is_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    pub is_finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Checkout> for CheckoutView {
    fn from(checkout: &Checkout) -> Self {
        Self {
            id: checkout.id,
            user: checkout.user,
            checkout_items: checkout.items.clone(),
            shipping_address: checkout.shipping_address.clone(),
            payment_method: checkout.payment_method.clone(),
            total_price: checkout.total_price,
            payment_status: checkout.state.payment_status().to_owned(),
            is_paid: checkout.state.is_paid(),
            paid_at: checkout.state.paid_at(),
            payment_details: checkout.state.payment_details().cloned(),
            is_finalized: checkout.state.is_finalized(),
            finalized_at: checkout.state.finalized_at(),
            created_at: checkout.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_cannot_finalize() {
        let state = CheckoutState::Pending;
        assert_eq!(
            state.finalize(Utc::now()),
            Err(TransitionError::NotPaid)
        );
    }

    #[test]
    fn test_pay_then_finalize() {
        let paid = CheckoutState::Pending
            .pay(Some(serde_json::json!({"txn": "abc"})), Utc::now())
            .expect("pending accepts payment");
        assert!(paid.is_paid());
        assert!(!paid.is_finalized());
        assert_eq!(paid.payment_status(), "paid");

        let finalized = paid.finalize(Utc::now()).expect("paid accepts finalize");
        assert!(finalized.is_paid());
        assert!(finalized.is_finalized());
        assert!(finalized.finalized_at().is_some());
    }

    #[test]
    fn test_finalized_is_terminal() {
        let now = Utc::now();
        let finalized = CheckoutState::Pending
            .pay(None, now)
            .and_then(|s| s.finalize(now))
            .expect("reach finalized");

        assert_eq!(
            finalized.clone().pay(None, now),
            Err(TransitionError::AlreadyFinalized)
        );
        assert_eq!(
            finalized.finalize(now),
            Err(TransitionError::AlreadyFinalized)
        );
    }

    #[test]
    fn test_repay_overwrites_details() {
        let now = Utc::now();
        let paid = CheckoutState::Pending
            .pay(Some(serde_json::json!({"txn": "first"})), now)
            .and_then(|s| s.pay(Some(serde_json::json!({"txn": "second"})), now))
            .expect("re-pay allowed before finalize");

        assert_eq!(
            paid.payment_details(),
            Some(&serde_json::json!({"txn": "second"}))
        );
    }

    #[test]
    fn test_view_shape() {
        let now = Utc::now();
        let checkout = Checkout {
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
            state: CheckoutState::Pending,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(CheckoutView::from(&checkout)).expect("serialize");
        assert_eq!(json["paymentStatus"], "Pending");
        assert_eq!(json["isPaid"], false);
        assert_eq!(json["isFinalized"], false);
        assert!(json.get("paidAt").is_none());
        assert!(json.get("checkoutItems").is_some());
    }
}
