//! Newsletter subscriber store backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use threadline_core::{Email, SubscriberId};

use super::{RepositoryError, SubscriberStore};
use crate::models::Subscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    subscribed_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: SubscriberId::new(row.id),
            email,
            subscribed_at: row.subscribed_at,
        })
    }
}

/// `PostgreSQL` implementation of [`SubscriberStore`].
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, subscribed_at FROM subscribers WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO subscribers (id, email, subscribed_at) VALUES ($1, $2, $3)")
            .bind(subscriber.id.as_uuid())
            .bind(subscriber.email.as_str())
            .bind(subscriber.subscribed_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
                {
                    RepositoryError::Conflict("email already subscribed".to_owned())
                } else {
                    RepositoryError::Database(e)
                }
            })?;

        Ok(())
    }
}
