//! Cart route handlers for users and guests.
//!
//! Guests are identified by a `guestId` token. The first add without one
//! mints a token and returns it inside the cart payload; the client sends
//! it back on every later call. Authenticated requests ignore `guestId`.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use chrono::Utc;
use threadline_core::{GuestId, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Cart, LineKey};
use crate::services::carts::{AddItem, CartError, CartIdentity};
use crate::state::AppState;

fn identity(
    auth: &OptionalAuth,
    guest_id: Option<&String>,
) -> Result<CartIdentity> {
    if let Some(user) = &auth.0 {
        return Ok(CartIdentity::User(user.id));
    }
    guest_id
        .map(|g| CartIdentity::Guest(GuestId::new(g.clone())))
        .ok_or_else(|| AppError::BadRequest("guestId is required for guest carts".to_string()))
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub guest_id: Option<String>,
}

const fn default_quantity() -> u32 {
    1
}

/// Add an item. Returns 201 with a brand-new cart (minting a guest token
/// for anonymous callers), 200 when an existing cart was updated.
#[instrument(skip(state, auth, body), fields(product_id = %body.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let identity = match identity(&auth, body.guest_id.as_ref()) {
        Ok(identity) => identity,
        // First anonymous add: mint a token the client keeps.
        Err(_) => CartIdentity::Guest(GuestId::mint(Utc::now())),
    };

    let outcome = state
        .carts()
        .add_item(
            &identity,
            AddItem {
                product_id: body.product_id,
                quantity: body.quantity,
                size: body.size,
                color: body.color,
            },
        )
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.cart)))
}

/// Query parameters for guest cart reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub guest_id: Option<String>,
}

/// Fetch the active cart.
#[instrument(skip(state, auth, query))]
pub async fn get_cart(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<CartQuery>,
) -> Result<Json<Cart>> {
    // No token and no guest token means there is no cart to look up.
    let Ok(identity) = identity(&auth, query.guest_id.as_ref()) else {
        return Err(CartError::CartNotFound.into());
    };
    let cart = state.carts().get(&identity).await?;
    Ok(Json(cart))
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub guest_id: Option<String>,
}

/// Set a line's quantity. Zero or below removes the line.
#[instrument(skip(state, auth, body), fields(product_id = %body.product_id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Json<Cart>> {
    let identity = identity(&auth, body.guest_id.as_ref())?;
    let key = LineKey {
        product_id: body.product_id,
        size: body.size,
        color: body.color,
    };
    let cart = state
        .carts()
        .set_quantity(&identity, &key, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Line removal request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub guest_id: Option<String>,
}

/// Remove a line from the cart.
#[instrument(skip(state, auth, body), fields(product_id = %body.product_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(body): Json<RemoveItemRequest>,
) -> Result<Json<Cart>> {
    let identity = identity(&auth, body.guest_id.as_ref())?;
    let key = LineKey {
        product_id: body.product_id,
        size: body.size,
        color: body.color,
    };
    let cart = state.carts().remove_item(&identity, &key).await?;
    Ok(Json(cart))
}

/// Merge request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub guest_id: String,
}

/// Merge a guest cart into the caller's cart at login.
///
/// A token whose cart is already gone falls back to whatever cart the user
/// has, so retrying a merge after success is harmless.
#[instrument(skip(state, body))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<MergeRequest>,
) -> Result<Json<Cart>> {
    let guest = GuestId::new(body.guest_id);
    match state.carts().merge(current.id, &guest).await {
        Ok(cart) => Ok(Json(cart)),
        Err(CartError::GuestCartNotFound) => {
            let cart = state
                .carts()
                .find_for_user(current.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;
            Ok(Json(cart))
        }
        Err(err) => Err(err.into()),
    }
}
