//! Checkout session creation, payment confirmation, and finalization.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::warn;

use threadline_core::{CheckoutId, UserId};

use crate::db::{CartStore, CheckoutStore, OrderStore, RepositoryError};
use crate::models::checkout::PAID_STATUS;
use crate::models::{Checkout, CheckoutState, LineItem, Order, ShippingAddress};

/// Checkout operation failures.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Create was called with no items.
    #[error("checkout requires at least one item")]
    NoItems,

    /// No session with the given ID.
    #[error("checkout not found")]
    NotFound,

    /// Payment confirmation did not carry the exact paid status value.
    #[error("payment is not completed")]
    PaymentNotCompleted,

    /// Finalize on a session that is not paid.
    #[error("checkout is not paid")]
    NotPaid,

    /// Pay or finalize on a session that is already finalized.
    #[error("checkout already finalized")]
    AlreadyFinalized,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Payment confirmation payload from the client.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// Must be exactly `"paid"`, case-sensitive.
    pub status: String,
    /// Opaque provider payload stored alongside the session.
    pub details: Option<serde_json::Value>,
}

/// Checkout logic over the store traits.
#[derive(Clone)]
pub struct CheckoutService {
    checkouts: Arc<dyn CheckoutStore>,
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        checkouts: Arc<dyn CheckoutStore>,
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
    ) -> Self {
        Self {
            checkouts,
            orders,
            carts,
        }
    }

    /// Create a pending checkout session from a snapshot of cart items.
    ///
    /// The client-supplied total is stored as-is; a mismatch against the
    /// item sum is logged but not rejected, since historical clients price
    /// shipping and tax on their side.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NoItems`] when the item list is empty.
    pub async fn create(
        &self,
        user: UserId,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        payment_method: String,
        total_price: Decimal,
    ) -> Result<Checkout, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::NoItems);
        }

        let now = Utc::now();
        let checkout = Checkout {
            id: CheckoutId::generate(),
            user,
            items,
            shipping_address,
            payment_method,
            total_price,
            state: CheckoutState::Pending,
            created_at: now,
            updated_at: now,
        };

        let items_total = checkout.items_total();
        if items_total != checkout.total_price {
            warn!(
                checkout_id = %checkout.id,
                client_total = %checkout.total_price,
                items_total = %items_total,
                "checkout total differs from item sum"
            );
        }

        self.checkouts.insert(&checkout).await?;
        Ok(checkout)
    }

    /// Fetch a session.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NotFound`] for an unknown ID.
    pub async fn get(&self, id: CheckoutId) -> Result<Checkout, CheckoutError> {
        self.checkouts
            .find_by_id(id)
            .await?
            .ok_or(CheckoutError::NotFound)
    }

    /// Record a payment confirmation on a session.
    ///
    /// Only the literal status `"paid"` is accepted; `"Paid"`, `"PAID"` and
    /// everything else are rejected without touching the session.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::PaymentNotCompleted`] for any other status,
    /// [`CheckoutError::AlreadyFinalized`] when the session is sealed.
    pub async fn mark_paid(
        &self,
        id: CheckoutId,
        confirmation: PaymentConfirmation,
    ) -> Result<Checkout, CheckoutError> {
        if confirmation.status != PAID_STATUS {
            return Err(CheckoutError::PaymentNotCompleted);
        }

        self.checkouts
            .mark_paid(id, confirmation.details, Utc::now())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CheckoutError::NotFound,
                RepositoryError::Conflict(_) => CheckoutError::AlreadyFinalized,
                other => CheckoutError::Repository(other),
            })
    }

    /// Convert a paid session into an order.
    ///
    /// The session is sealed first with a compare-and-swap on the paid
    /// state, so of any number of concurrent finalize calls exactly one
    /// creates an order. The caller's active cart is cleared afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NotPaid`] for a pending session and
    /// [`CheckoutError::AlreadyFinalized`] for a sealed one.
    pub async fn finalize(&self, id: CheckoutId) -> Result<Order, CheckoutError> {
        let now = Utc::now();
        let checkout = match self.checkouts.mark_finalized(id, now).await {
            Ok(checkout) => checkout,
            Err(RepositoryError::NotFound) => return Err(CheckoutError::NotFound),
            Err(RepositoryError::Conflict(_)) => {
                let existing = self.get(id).await?;
                return Err(if existing.state.is_finalized() {
                    CheckoutError::AlreadyFinalized
                } else {
                    CheckoutError::NotPaid
                });
            }
            Err(other) => return Err(other.into()),
        };

        let order = Order::from_checkout(&checkout, now);
        self.orders.insert(&order).await?;
        self.carts.delete_by_user(checkout.user).await?;
        Ok(order)
    }
}
