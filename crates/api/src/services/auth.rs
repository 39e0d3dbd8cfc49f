//! Password hashing and bearer token issuance.
//!
//! Passwords are hashed with argon2id. Tokens are HS256 JWTs carrying the
//! user ID and role, valid for a configurable number of hours.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use threadline_core::{UserId, UserRole};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email or password did not match a user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password rejected at registration time.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// Bearer token was missing, malformed, or expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Hashing backend failure.
    #[error("password hashing failed")]
    Hashing,
}

/// JWT payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    /// Role at issuance time.
    pub role: UserRole,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies credentials and tokens.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: SecretString,
    token_ttl_hours: i64,
}

impl AuthService {
    #[must_use]
    pub const fn new(jwt_secret: SecretString, token_ttl_hours: i64) -> Self {
        Self {
            jwt_secret,
            token_ttl_hours,
        }
    }

    /// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::WeakPassword`] on rejection.
    pub fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        Ok(())
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the backend fails.
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::Hashing)
    }

    /// Verify a password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when they do not match.
    pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::Hashing)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Issue a signed token for a user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if signing fails.
    pub fn issue_token(&self, user: UserId, role: UserRole) -> Result<String, AuthError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user,
            role,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.token_ttl_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.expose_secret().as_bytes()),
        )
        .map_err(|_| AuthError::Hashing)
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] on any verification failure.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}
