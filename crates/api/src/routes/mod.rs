//! HTTP route handlers for the public API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//! GET  /health/ready               - Database readiness check
//!
//! # Users
//! POST /api/users/register         - Create an account
//! POST /api/users/login            - Exchange credentials for a token
//! GET  /api/users/profile          - Current user (auth)
//!
//! # Cart (users and guests)
//! POST /api/cart                   - Add an item (mints a guest token if needed)
//! GET  /api/cart                   - Fetch the active cart
//! PUT  /api/cart                   - Set a line's quantity
//! DELETE /api/cart                 - Remove a line
//! POST /api/cart/merge             - Merge a guest cart at login (auth)
//!
//! # Checkout (auth)
//! POST /api/checkout               - Create a session from cart items
//! PUT  /api/checkout/{id}/pay      - Record a payment confirmation
//! POST /api/checkout/{id}/finalize - Convert a paid session into an order
//!
//! # Orders (auth)
//! GET  /api/orders/my-orders       - Own order history, newest first
//! GET  /api/orders/{id}            - Order detail (owner or admin)
//!
//! # Admin (auth + admin role)
//! GET  /api/admin/users            - List users
//! POST /api/admin/users            - Create a user
//! PUT  /api/admin/users/{id}       - Update name/email/role
//! DELETE /api/admin/users/{id}     - Delete a user
//! GET  /api/admin/orders           - All orders with owners joined
//! PUT  /api/admin/orders/{id}      - Set fulfillment status
//! DELETE /api/admin/orders/{id}    - Delete an order
//! GET  /api/admin/products         - Product catalog
//!
//! # Misc
//! POST /api/subscribe              - Newsletter signup
//! POST /api/upload                 - Image passthrough to the media host
//! ```

pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod subscribe;
pub mod upload;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/profile", get(users::profile))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(cart::add_item)
                .get(cart::get_cart)
                .put(cart::update_quantity)
                .delete(cart::remove_item),
        )
        .route("/merge", post(cart::merge))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::create))
        .route("/{id}/pay", put(checkout::pay))
        .route("/{id}/finalize", post(checkout::finalize))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/my-orders", get(orders::list_mine))
        .route("/{id}", get(orders::detail))
}

/// Create the admin routes router. Every handler here checks the admin role
/// through the `AdminAuth` extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/{id}", put(users::update).delete(users::remove))
        .route("/orders", get(orders::list_all))
        .route(
            "/orders/{id}",
            put(orders::set_status).delete(orders::remove),
        )
        .route("/products", get(products::list))
}

/// Create the full application router with all routes mounted.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", user_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
        .route("/subscribe", post(subscribe::subscribe))
        .route("/upload", post(upload::upload_image));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
        .with_state(state)
}
