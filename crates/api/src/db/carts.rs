//! Active cart store backed by `PostgreSQL`.
//!
//! A cart row is owned by exactly one of `user_id` or `guest_id`. Line items
//! are stored as a JSONB array; the unique indexes on the owner columns keep
//! one active cart per identity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use threadline_core::{CartId, GuestId, UserId};

use super::{CartStore, RepositoryError};
use crate::models::{Cart, LineItem};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Option<Uuid>,
    guest_id: Option<String>,
    items: Json<Vec<LineItem>>,
    total_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user: row.user_id.map(UserId::new),
            guest_id: row.guest_id.map(GuestId::new),
            items: row.items.0,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` implementation of [`CartStore`].
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CART_COLUMNS: &str = "id, user_id, guest_id, items, total_price, created_at, updated_at";

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_by_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE guest_id = $1"
        ))
        .bind(guest.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, guest_id, items, total_price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                 user_id = EXCLUDED.user_id, \
                 guest_id = EXCLUDED.guest_id, \
                 items = EXCLUDED.items, \
                 total_price = EXCLUDED.total_price, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user.map(|u| u.as_uuid()))
        .bind(cart.guest_id.as_ref().map(GuestId::as_str))
        .bind(Json(&cart.items))
        .bind(cart.total_price)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn claim_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError> {
        // DELETE .. RETURNING is atomic; concurrent claims race on the row
        // lock and the loser sees no row.
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "DELETE FROM carts WHERE guest_id = $1 RETURNING {CART_COLUMNS}"
        ))
        .bind(guest.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_by_user(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
