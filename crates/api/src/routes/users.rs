//! User account route handlers: registration, login, profile, and the
//! admin CRUD surface.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::{Email, UserId, UserRole};

use crate::db::{NewUser, RepositoryError, UserUpdate};
use crate::error::{AppError, Result};
use crate::middleware::{AdminAuth, RequireAuth};
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User payload plus a fresh bearer token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw.trim()).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Create an account and return it with a token.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let email = parse_email(&body.email)?;
    AuthService::validate_password(&body.password)?;
    let password_hash = AuthService::hash_password(&body.password)?;

    let user = state
        .stores()
        .users
        .create(NewUser {
            name: body.name.trim().to_owned(),
            email,
            password_hash,
            role: UserRole::Customer,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

    let token = state.auth().issue_token(user.id, user.role)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Exchange credentials for a bearer token.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = parse_email(&body.email)?;

    let found = state.stores().users.find_with_password(&email).await?;
    let Some(found) = found else {
        // Same response as a wrong password, no account enumeration.
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    };

    AuthService::verify_password(&body.password, &found.password_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = state.auth().issue_token(found.user.id, found.user.role)?;
    Ok(Json(AuthResponse {
        user: found.user,
        token,
    }))
}

/// Current user's profile.
#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = state
        .stores()
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// List all users (admin).
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.stores().users.list().await?))
}

/// Admin user creation request body. Role defaults to customer.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Create a user (admin).
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn create(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    let email = parse_email(&body.email)?;
    AuthService::validate_password(&body.password)?;
    let password_hash = AuthService::hash_password(&body.password)?;

    let user = state
        .stores()
        .users
        .create(NewUser {
            name: body.name.trim().to_owned(),
            email,
            password_hash,
            role: body.role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

    tracing::info!(user_id = %user.id, role = %user.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Admin update request body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

/// Update a user (admin).
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let email = body.email.as_deref().map(parse_email).transpose()?;
    let user = state
        .stores()
        .users
        .update(
            id,
            UserUpdate {
                name: body.name,
                email,
                role: body.role,
            },
        )
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
            RepositoryError::Conflict(_) => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

    Ok(Json(user))
}

/// Delete a user (admin).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>> {
    state.stores().users.delete(id).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
        other => AppError::Database(other),
    })?;

    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}
