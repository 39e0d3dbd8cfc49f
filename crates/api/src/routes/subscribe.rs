//! Newsletter subscription route handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use threadline_core::{Email, SubscriberId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::models::Subscriber;
use crate::state::AppState;

/// Subscription request body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Subscribe an email to the newsletter. Duplicates are rejected.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(body.email.trim())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let subscriber = Subscriber {
        id: SubscriberId::generate(),
        email,
        subscribed_at: Utc::now(),
    };
    state
        .stores()
        .subscribers
        .insert(&subscriber)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("Email already subscribed".to_string())
            }
            other => AppError::Database(other),
        })?;

    tracing::info!("newsletter subscription");
    Ok((StatusCode::CREATED, Json(subscriber)))
}
