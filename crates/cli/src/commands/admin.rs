//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! tl-cli admin create -e admin@example.com -n "Admin Name" -p <password>
//! ```
//!
//! # Environment Variables
//!
//! - `API_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use sqlx::PgPool;
use thiserror::Error;

use threadline_api::db::{NewUser, PgUserStore, RepositoryError, UserStore};
use threadline_api::services::AuthService;
use threadline_core::{Email, EmailError, UserRole};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected.
    #[error("Invalid password: must be at least 8 characters")]
    InvalidPassword,

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Repository failure.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns an error when the email is taken or the password is too short.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("API_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| AdminError::MissingEnvVar("API_DATABASE_URL"))?;

    let parsed = Email::parse(email)?;
    AuthService::validate_password(password).map_err(|_| AdminError::InvalidPassword)?;
    let password_hash =
        AuthService::hash_password(password).map_err(|_| AdminError::InvalidPassword)?;

    let pool = PgPool::connect(&database_url).await?;
    let store = PgUserStore::new(pool);

    let user = store
        .create(NewUser {
            name: name.to_owned(),
            email: parsed,
            password_hash,
            role: UserRole::Admin,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "admin user created");
    Ok(())
}
