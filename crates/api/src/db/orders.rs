//! Order store backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use threadline_core::{OrderId, OrderStatus, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{LineItem, Order, ShippingAddress};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<LineItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_status: String,
    payment_details: Option<serde_json::Value>,
    status: String,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid order status: {e}")))?;

        Ok(Self {
            id: OrderId::new(row.id),
            user: UserId::new(row.user_id),
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            total_price: row.total_price,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            payment_status: row.payment_status,
            payment_details: row.payment_details,
            status,
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` implementation of [`OrderStore`].
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, total_price, \
                             is_paid, paid_at, payment_status, payment_details, status, \
                             is_delivered, delivered_at, created_at, updated_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders \
                 (id, user_id, items, shipping_address, payment_method, total_price, \
                  is_paid, paid_at, payment_status, payment_details, status, \
                  is_delivered, delivered_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user.as_uuid())
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .bind(order.total_price)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(&order.payment_status)
        .bind(&order.payment_details)
        .bind(order.status.to_string())
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET \
                 status = $2, is_delivered = $3, delivered_at = $4, \
                 is_paid = $5, paid_at = $6, payment_status = $7, payment_details = $8, \
                 updated_at = $9 \
             WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.to_string())
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(&order.payment_status)
        .bind(&order.payment_details)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
