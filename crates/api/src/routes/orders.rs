//! Order route handlers: customer history plus the admin surface.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use threadline_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::{AdminAuth, RequireAuth};
use crate::models::{Order, OrderView, OwnerSummary};
use crate::state::AppState;

async fn load(state: &AppState, id: OrderId) -> Result<Order> {
    state
        .stores()
        .orders
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Join the owner's name and email into the view. An order whose owner was
/// deleted falls back to the bare ID.
async fn populate(state: &AppState, order: &Order) -> Result<OrderView> {
    let owner = state.stores().users.find_by_id(order.user).await?;
    Ok(match owner {
        Some(user) => OrderView::populated(
            order,
            OwnerSummary {
                name: user.name,
                email: user.email,
            },
        ),
        None => OrderView::new(order),
    })
}

/// Caller's order history, most recent first.
#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.stores().orders.list_by_user(current.id).await?;
    Ok(Json(orders.iter().map(OrderView::new).collect()))
}

/// Order detail, visible to its owner and to admins.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = load(&state, id).await?;
    if order.user != current.id && !current.role.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this order".to_string(),
        ));
    }
    Ok(Json(populate(&state, &order).await?))
}

/// All orders (admin), most recent first.
#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.stores().orders.list_all().await?;
    let mut views = Vec::with_capacity(orders.len());
    for order in &orders {
        views.push(populate(&state, order).await?);
    }
    Ok(Json(views))
}

/// Status update request body.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// Set an order's fulfillment status (admin). Moving to `Delivered` stamps
/// the delivery fields; moving away clears them.
#[instrument(skip(state, body))]
pub async fn set_status(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<OrderView>> {
    let mut order = load(&state, id).await?;
    order.set_status(body.status, Utc::now());
    state.stores().orders.save(&order).await?;
    Ok(Json(populate(&state, &order).await?))
}

/// Delete an order (admin).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    state
        .stores()
        .orders
        .delete(id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("Order not found".to_string())
            }
            other => AppError::Database(other),
        })?;
    Ok(Json(serde_json::json!({ "message": "Order deleted" })))
}
