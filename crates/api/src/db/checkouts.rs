//! Checkout session store backed by `PostgreSQL`.
//!
//! State transitions are compare-and-swap updates on the `state` column so
//! concurrent confirmations and finalizations resolve in the database, with
//! exactly one winner per paid session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use threadline_core::{CheckoutId, UserId};

use super::{CheckoutStore, RepositoryError, checkout_state_column, checkout_state_from_columns};
use crate::models::{Checkout, LineItem, ShippingAddress};

#[derive(Debug, sqlx::FromRow)]
struct CheckoutRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<LineItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    total_price: Decimal,
    state: String,
    payment_details: Option<serde_json::Value>,
    paid_at: Option<DateTime<Utc>>,
    finalized_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CheckoutRow> for Checkout {
    type Error = RepositoryError;

    fn try_from(row: CheckoutRow) -> Result<Self, Self::Error> {
        let state = checkout_state_from_columns(
            &row.state,
            row.payment_details,
            row.paid_at,
            row.finalized_at,
        )?;

        Ok(Self {
            id: CheckoutId::new(row.id),
            user: UserId::new(row.user_id),
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            total_price: row.total_price,
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` implementation of [`CheckoutStore`].
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CHECKOUT_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, \
                                total_price, state, payment_details, paid_at, finalized_at, \
                                created_at, updated_at";

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn insert(&self, checkout: &Checkout) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO checkouts \
                 (id, user_id, items, shipping_address, payment_method, total_price, \
                  state, payment_details, paid_at, finalized_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(checkout.id.as_uuid())
        .bind(checkout.user.as_uuid())
        .bind(Json(&checkout.items))
        .bind(Json(&checkout.shipping_address))
        .bind(&checkout.payment_method)
        .bind(checkout.total_price)
        .bind(checkout_state_column(&checkout.state))
        .bind(checkout.state.payment_details())
        .bind(checkout.state.paid_at())
        .bind(checkout.state.finalized_at())
        .bind(checkout.created_at)
        .bind(checkout.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>, RepositoryError> {
        let row = sqlx::query_as::<_, CheckoutRow>(&format!(
            "SELECT {CHECKOUT_COLUMNS} FROM checkouts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn mark_paid(
        &self,
        id: CheckoutId,
        payment_details: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError> {
        let row = sqlx::query_as::<_, CheckoutRow>(&format!(
            "UPDATE checkouts SET \
                 state = 'paid', payment_details = $2, paid_at = $3, updated_at = $3 \
             WHERE id = $1 AND state <> 'finalized' \
             RETURNING {CHECKOUT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(payment_details)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                if self.find_by_id(id).await?.is_some() {
                    Err(RepositoryError::Conflict(
                        "checkout already finalized".to_owned(),
                    ))
                } else {
                    Err(RepositoryError::NotFound)
                }
            }
        }
    }

    async fn mark_finalized(
        &self,
        id: CheckoutId,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError> {
        let row = sqlx::query_as::<_, CheckoutRow>(&format!(
            "UPDATE checkouts SET state = 'finalized', finalized_at = $2, updated_at = $2 \
             WHERE id = $1 AND state = 'paid' \
             RETURNING {CHECKOUT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                if self.find_by_id(id).await?.is_some() {
                    Err(RepositoryError::Conflict(
                        "checkout is not in the paid state".to_owned(),
                    ))
                } else {
                    Err(RepositoryError::NotFound)
                }
            }
        }
    }
}
