//! Database operations for `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Customer and admin accounts (argon2 password hashes)
//! - `products` - Catalog (images, sizes, colors as JSONB)
//! - `carts` - One active cart per user or guest (line items as JSONB)
//! - `checkouts` - Checkout sessions with the payment state machine
//! - `orders` - Finalized orders (self-contained copies of checkout data)
//! - `subscribers` - Newsletter signups
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p tl-cli -- migrate
//! ```
//!
//! Every entity is accessed through a store trait so handlers and services
//! can run against in-memory fakes in tests. `Stores` bundles the six traits
//! behind `Arc`s and has a `postgres` and an `in_memory` constructor.

pub mod carts;
pub mod checkouts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod subscribers;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use threadline_core::{CheckoutId, Email, GuestId, OrderId, ProductId, UserId, UserRole};

use crate::models::{Cart, Checkout, CheckoutState, Order, Product, Subscriber, User};

pub use carts::PgCartStore;
pub use checkouts::PgCheckoutStore;
pub use orders::PgOrderStore;
pub use products::PgProductStore;
pub use subscribers::PgSubscriberStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Fields for creating a user row. The caller hashes the password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
}

/// A user together with their stored password hash, for login verification
/// only. Never serialized.
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Mutable user fields for admin updates. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<UserRole>,
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user plus password hash for credential verification.
    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<UserWithPassword>, RepositoryError>;

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    /// Apply an update to an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the user does not exist.
    async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the user does not exist.
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn create(&self, product: Product) -> Result<Product, RepositoryError>;
}

/// Active cart storage. At most one cart per user and one per guest token.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError>;

    async fn find_by_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError>;

    /// Insert or replace the cart, keyed by its ID.
    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError>;

    /// Atomically remove and return the guest's cart. Returns `None` when no
    /// such cart exists; two concurrent claims cannot both win.
    async fn claim_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError>;

    /// Remove the user's cart if present.
    async fn delete_by_user(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Checkout session storage with compare-and-swap state transitions.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert(&self, checkout: &Checkout) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>, RepositoryError>;

    /// Transition the session to paid, overwriting paid state if already
    /// paid, unless it has been finalized.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the row does not exist,
    /// [`RepositoryError::Conflict`] when the session is already finalized.
    async fn mark_paid(
        &self,
        id: CheckoutId,
        payment_details: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError>;

    /// Transition paid -> finalized. The update only matches rows that are
    /// currently paid, so exactly one of any number of concurrent callers
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the row does not exist,
    /// [`RepositoryError::Conflict`] when the session is not in the paid
    /// state.
    async fn mark_finalized(
        &self,
        id: CheckoutId,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders belonging to one user, most recent first.
    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// All orders, most recent first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Persist changes to an existing order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the order does not exist.
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the order does not exist.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
}

/// Newsletter subscriber storage.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError>;

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), RepositoryError>;
}

/// All stores the application needs, behind trait objects so tests can swap
/// in the in-memory implementations.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub checkouts: Arc<dyn CheckoutStore>,
    pub orders: Arc<dyn OrderStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            products: Arc::new(PgProductStore::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool.clone())),
            checkouts: Arc::new(PgCheckoutStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            subscribers: Arc::new(PgSubscriberStore::new(pool)),
        }
    }

    /// Stores backed by in-process maps, for tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            products: Arc::new(memory::MemoryProductStore::default()),
            carts: Arc::new(memory::MemoryCartStore::default()),
            checkouts: Arc::new(memory::MemoryCheckoutStore::default()),
            orders: Arc::new(memory::MemoryOrderStore::default()),
            subscribers: Arc::new(memory::MemorySubscriberStore::default()),
        }
    }
}

/// Reconstruct a [`CheckoutState`] from flat row columns.
///
/// # Errors
///
/// Returns [`RepositoryError::DataCorruption`] when the columns disagree,
/// for example a finalized row without a paid timestamp.
pub(crate) fn checkout_state_from_columns(
    state: &str,
    payment_details: Option<serde_json::Value>,
    paid_at: Option<DateTime<Utc>>,
    finalized_at: Option<DateTime<Utc>>,
) -> Result<CheckoutState, RepositoryError> {
    match state {
        "pending" => Ok(CheckoutState::Pending),
        "paid" => {
            let paid_at = paid_at.ok_or_else(|| {
                RepositoryError::DataCorruption("paid checkout without paid_at".to_owned())
            })?;
            Ok(CheckoutState::Paid {
                payment_details,
                paid_at,
            })
        }
        "finalized" => {
            let paid_at = paid_at.ok_or_else(|| {
                RepositoryError::DataCorruption("finalized checkout without paid_at".to_owned())
            })?;
            let finalized_at = finalized_at.ok_or_else(|| {
                RepositoryError::DataCorruption(
                    "finalized checkout without finalized_at".to_owned(),
                )
            })?;
            Ok(CheckoutState::Finalized {
                payment_details,
                paid_at,
                finalized_at,
            })
        }
        other => Err(RepositoryError::DataCorruption(format!(
            "unknown checkout state: {other}"
        ))),
    }
}

/// Column value for a [`CheckoutState`] discriminant.
pub(crate) const fn checkout_state_column(state: &CheckoutState) -> &'static str {
    match state {
        CheckoutState::Pending => "pending",
        CheckoutState::Paid { .. } => "paid",
        CheckoutState::Finalized { .. } => "finalized",
    }
}
