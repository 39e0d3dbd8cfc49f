//! Product catalog route handlers.
//!
//! The catalog is managed out of band (seeded through the CLI); the API only
//! exposes an admin listing.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::AdminAuth;
use crate::models::Product;
use crate::state::AppState;

/// Product catalog listing (admin), newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.stores().products.list().await?))
}
