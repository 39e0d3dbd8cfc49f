//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use threadline_core::{Email, UserId, UserRole};

/// A registered user account.
///
/// The password is stored only as an argon2 hash and lives in the storage
/// layer, never on this type, so a `User` can always be serialized straight
/// into an API response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (unique).
    pub email: Email,
    /// Access-control role.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}
