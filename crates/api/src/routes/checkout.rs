//! Checkout route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use threadline_core::CheckoutId;

use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireAuth};
use crate::models::{Checkout, CheckoutView, LineItem, OrderView, ShippingAddress};
use crate::services::checkout::PaymentConfirmation;
use crate::state::AppState;

/// Checkout creation request body. Items are the client's snapshot of its
/// cart; the server stores them verbatim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub checkout_items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
}

/// Sessions are visible to their owner and to admins.
fn authorize(checkout: &Checkout, current: &CurrentUser) -> Result<()> {
    if checkout.user != current.id && !current.role.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this checkout".to_string(),
        ));
    }
    Ok(())
}

/// Create a pending checkout session.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse> {
    let checkout = state
        .checkout()
        .create(
            current.id,
            body.checkout_items,
            body.shipping_address,
            body.payment_method,
            body.total_price,
        )
        .await?;

    tracing::info!(checkout_id = %checkout.id, "checkout created");
    Ok((StatusCode::CREATED, Json(CheckoutView::from(&checkout))))
}

/// Payment confirmation request body. `paymentDetails` is stored verbatim;
/// only `paymentStatus` is interpreted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    #[serde(default)]
    pub payment_status: String,
    pub payment_details: Option<serde_json::Value>,
}

/// Record a payment confirmation on a session.
#[instrument(skip(state, body))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<CheckoutId>,
    Json(body): Json<PayRequest>,
) -> Result<Json<CheckoutView>> {
    let checkout = state.checkout().get(id).await?;
    authorize(&checkout, &current)?;

    let checkout = state
        .checkout()
        .mark_paid(
            id,
            PaymentConfirmation {
                status: body.payment_status,
                details: body.payment_details,
            },
        )
        .await?;

    tracing::info!(checkout_id = %checkout.id, "checkout paid");
    Ok(Json(CheckoutView::from(&checkout)))
}

/// Convert a paid session into an order.
#[instrument(skip(state))]
pub async fn finalize(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<CheckoutId>,
) -> Result<impl IntoResponse> {
    let checkout = state.checkout().get(id).await?;
    authorize(&checkout, &current)?;

    let order = state.checkout().finalize(id).await?;
    tracing::info!(checkout_id = %id, order_id = %order.id, "checkout finalized");
    Ok((StatusCode::CREATED, Json(OrderView::new(&order))))
}
