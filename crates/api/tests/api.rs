//! End-to-end tests over the router with in-memory stores.
//!
//! Every test builds the full application router and drives it with plain
//! HTTP requests, so routing, extractors, status codes and wire shapes are
//! all exercised. Money totals appear as decimal strings on the wire.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use threadline_api::config::ApiConfig;
use threadline_api::db::Stores;
use threadline_api::models::{Product, ProductImage};
use threadline_api::routes;
use threadline_api::state::AppState;
use threadline_core::ProductId;

fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().expect("addr"),
        port: 0,
        jwt_secret: SecretString::from("kX9#mP2$vL5@qR8!wT3%yU6^zA1&bC4*"),
        token_ttl_hours: 40,
        media: None,
        sentry_dsn: None,
    }
}

async fn app() -> (Router, AppState) {
    let state = AppState::new(test_config(), Stores::in_memory());
    (routes::router(state.clone()), state)
}

async fn seed_product(state: &AppState, name: &str, price: &str) -> ProductId {
    let product = Product {
        id: ProductId::generate(),
        name: name.to_owned(),
        description: format!("{name} description"),
        price: price.parse().expect("decimal literal"),
        images: vec![ProductImage {
            url: format!("https://img.example.com/{name}.jpg"),
            alt_text: None,
        }],
        sizes: vec!["S".to_owned(), "M".to_owned()],
        colors: vec!["white".to_owned(), "navy".to_owned()],
        created_at: chrono::Utc::now(),
    };
    let id = product.id;
    state
        .stores()
        .products
        .create(product)
        .await
        .expect("seed product");
    id
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn register(router: &Router, name: &str, email: &str, password: &str) -> (Value, String) {
    let (status, body) = send(
        router,
        request(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "name": name, "email": email, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let token = body["token"].as_str().expect("token").to_owned();
    (body, token)
}

fn add_body(product_id: ProductId, quantity: u32, guest_id: Option<&str>) -> Value {
    let mut body = json!({
        "productId": product_id,
        "quantity": quantity,
        "size": "M",
        "color": "white",
    });
    if let Some(guest_id) = guest_id {
        body["guestId"] = json!(guest_id);
    }
    body
}

#[tokio::test]
async fn test_register_login_profile_roundtrip() {
    let (router, _state) = app().await;

    let (body, token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "customer");

    // Duplicate email conflicts.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "name": "Ada2", "email": "ada@example.com", "password": "hunter2hunter2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password is a 401 with no account hint.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/api/users/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/api/users/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter2hunter2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, body) = send(&router, request("GET", "/api/users/profile", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    // Short passwords are rejected up front.
    let (status, _) = send(
        &router,
        request(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_cart_flow() {
    let (router, state) = app().await;
    let product_id = seed_product(&state, "linen-shirt", "29.99").await;

    // Reading with neither a token nor a guest token is a 404, not a 400.
    let (status, _) = send(&router, request("GET", "/api/cart", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // First anonymous add mints a guest token and creates the cart.
    let (status, cart) = send(
        &router,
        request("POST", "/api/cart", None, Some(add_body(product_id, 2, None))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let guest_id = cart["guestId"].as_str().expect("guest token").to_owned();
    assert!(guest_id.starts_with("guest_"));
    assert_eq!(cart["totalPrice"], "59.98");

    // Same line accumulates instead of duplicating.
    let (status, cart) = send(
        &router,
        request(
            "POST",
            "/api/cart",
            None,
            Some(add_body(product_id, 1, Some(&guest_id))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["products"].as_array().expect("lines").len(), 1);
    assert_eq!(cart["products"][0]["quantity"], 3);
    assert_eq!(cart["totalPrice"], "89.97");

    let (status, cart) = send(
        &router,
        request("GET", &format!("/api/cart?guestId={guest_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["products"][0]["name"], "linen-shirt");

    // Absurd quantities clamp at the maximum instead of wrapping the line.
    let (status, cart) = send(
        &router,
        request(
            "POST",
            "/api/cart",
            None,
            Some(add_body(product_id, u32::MAX, Some(&guest_id))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["products"][0]["quantity"], u32::MAX);

    // Quantity zero removes the line.
    let (status, cart) = send(
        &router,
        request(
            "PUT",
            "/api/cart",
            None,
            Some(json!({
                "productId": product_id,
                "size": "M",
                "color": "white",
                "quantity": 0,
                "guestId": guest_id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["products"].as_array().expect("lines").len(), 0);
    assert_eq!(cart["totalPrice"], "0");
}

#[tokio::test]
async fn test_cart_merge_at_login() {
    let (router, state) = app().await;
    let product_id = seed_product(&state, "linen-shirt", "29.99").await;
    let (_, token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;

    // User cart with one line.
    let (status, _) = send(
        &router,
        request("POST", "/api/cart", Some(&token), Some(add_body(product_id, 1, None))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Guest cart with the same line.
    let (status, cart) = send(
        &router,
        request("POST", "/api/cart", None, Some(add_body(product_id, 2, None))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let guest_id = cart["guestId"].as_str().expect("guest token").to_owned();

    let (status, merged) = send(
        &router,
        request(
            "POST",
            "/api/cart/merge",
            Some(&token),
            Some(json!({ "guestId": guest_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["products"][0]["quantity"], 3);
    assert_eq!(merged["totalPrice"], "89.97");

    // The guest cart is consumed; retrying falls back to the user cart.
    let (status, again) = send(
        &router,
        request(
            "POST",
            "/api/cart/merge",
            Some(&token),
            Some(json!({ "guestId": guest_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["products"][0]["quantity"], 3);

    let (status, _) = send(
        &router,
        request("GET", &format!("/api/cart?guestId={guest_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_merge_with_empty_guest_cart_is_rejected() {
    let (router, state) = app().await;
    let product_id = seed_product(&state, "linen-shirt", "29.99").await;
    let (_, token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;

    let (_, cart) = send(
        &router,
        request("POST", "/api/cart", None, Some(add_body(product_id, 1, None))),
    )
    .await;
    let guest_id = cart["guestId"].as_str().expect("guest token").to_owned();

    // Empty the cart, then try to merge it.
    let (status, _) = send(
        &router,
        request(
            "DELETE",
            "/api/cart",
            None,
            Some(json!({
                "productId": product_id,
                "size": "M",
                "color": "white",
                "guestId": guest_id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/api/cart/merge",
            Some(&token),
            Some(json!({ "guestId": guest_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // The rejected merge leaves the guest cart in place.
    let (status, _) = send(
        &router,
        request("GET", &format!("/api/cart?guestId={guest_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_end_to_end() {
    let (router, state) = app().await;
    let product_id = seed_product(&state, "linen-shirt", "29.99").await;
    let (_, token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;

    let (status, cart) = send(
        &router,
        request("POST", "/api/cart", Some(&token), Some(add_body(product_id, 2, None))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, checkout) = send(
        &router,
        request(
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({
                "checkoutItems": cart["products"],
                "shippingAddress": {
                    "address": "1 Main St",
                    "city": "Springfield",
                    "postalCode": "12345",
                    "country": "US",
                },
                "paymentMethod": "card",
                "totalPrice": "59.98",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{checkout}");
    assert_eq!(checkout["paymentStatus"], "Pending");
    assert_eq!(checkout["isPaid"], false);
    let checkout_id = checkout["id"].as_str().expect("id").to_owned();

    // Finalize before payment is rejected.
    let (status, _) = send(
        &router,
        request(
            "POST",
            &format!("/api/checkout/{checkout_id}/finalize"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Payment status is matched exactly, case-sensitive.
    let (status, _) = send(
        &router,
        request(
            "PUT",
            &format!("/api/checkout/{checkout_id}/pay"),
            Some(&token),
            Some(json!({ "paymentStatus": "Paid", "paymentDetails": { "id": "txn_1" } })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, paid) = send(
        &router,
        request(
            "PUT",
            &format!("/api/checkout/{checkout_id}/pay"),
            Some(&token),
            Some(json!({ "paymentStatus": "paid", "paymentDetails": { "id": "txn_1" } })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["isPaid"], true);
    assert_eq!(paid["paymentStatus"], "paid");
    assert_eq!(paid["paymentDetails"]["id"], "txn_1");

    let (status, order) = send(
        &router,
        request(
            "POST",
            &format!("/api/checkout/{checkout_id}/finalize"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["totalPrice"], "59.98");
    assert_eq!(order["status"], "Processing");
    assert_eq!(order["isPaid"], true);

    // Finalize is single-shot.
    let (status, _) = send(
        &router,
        request(
            "POST",
            &format!("/api/checkout/{checkout_id}/finalize"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The cart was cleared by finalization.
    let (status, _) = send(&router, request("GET", "/api/cart", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The order shows up in the owner's history with their details joined.
    let (status, mine) = send(&router, request("GET", "/api/orders/my-orders", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().expect("orders").len(), 1);

    let order_id = order["id"].as_str().expect("order id");
    let (status, detail) = send(
        &router,
        request("GET", &format!("/api/orders/{order_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_admin_role_enforcement() {
    use threadline_api::db::NewUser;
    use threadline_core::UserRole;

    let (router, state) = app().await;
    let (_, customer_token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;

    // No token at all.
    let (status, _) = send(&router, request("GET", "/api/admin/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Customer tokens are rejected from admin routes.
    let (status, _) = send(&router, request("GET", "/api/admin/users", Some(&customer_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, request("GET", "/api/admin/orders", Some(&customer_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Seed an admin and walk the admin user surface.
    let admin = state
        .stores()
        .users
        .create(NewUser {
            name: "Root".to_owned(),
            email: threadline_core::Email::parse("root@example.com").expect("email"),
            password_hash: "unused".to_owned(),
            role: UserRole::Admin,
        })
        .await
        .expect("seed admin");
    let admin_token = state
        .auth()
        .issue_token(admin.id, admin.role)
        .expect("token");

    let (status, users) = send(&router, request("GET", "/api/admin/users", Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().expect("users").len(), 2);

    // Promote the customer to admin.
    let customer_id = users
        .as_array()
        .expect("users")
        .iter()
        .find(|u| u["email"] == "ada@example.com")
        .and_then(|u| u["id"].as_str())
        .expect("customer id")
        .to_owned();
    let (status, updated) = send(
        &router,
        request(
            "PUT",
            &format!("/api/admin/users/{customer_id}"),
            Some(&admin_token),
            Some(json!({ "role": "admin" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "admin");

    // Admins can create accounts directly; role defaults to customer.
    let (status, created) = send(
        &router,
        request(
            "POST",
            "/api/admin/users",
            Some(&admin_token),
            Some(json!({
                "name": "Bea",
                "email": "bea@example.com",
                "password": "hunter2hunter2",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["role"], "customer");

    let (status, _) = send(
        &router,
        request(
            "POST",
            "/api/admin/users",
            Some(&admin_token),
            Some(json!({
                "name": "Bea",
                "email": "bea@example.com",
                "password": "hunter2hunter2",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &router,
        request(
            "DELETE",
            &format!("/api/admin/users/{customer_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    // Deleting again is a 404.
    let (status, _) = send(
        &router,
        request(
            "DELETE",
            &format!("/api/admin/users/{customer_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_order_status_updates() {
    use threadline_api::db::NewUser;
    use threadline_core::UserRole;

    let (router, state) = app().await;
    let product_id = seed_product(&state, "linen-shirt", "29.99").await;
    let (_, token) = register(&router, "Ada", "ada@example.com", "hunter2hunter2").await;

    let (_, cart) = send(
        &router,
        request("POST", "/api/cart", Some(&token), Some(add_body(product_id, 1, None))),
    )
    .await;
    let (_, checkout) = send(
        &router,
        request(
            "POST",
            "/api/checkout",
            Some(&token),
            Some(json!({
                "checkoutItems": cart["products"],
                "shippingAddress": {
                    "address": "1 Main St",
                    "city": "Springfield",
                    "postalCode": "12345",
                    "country": "US",
                },
                "paymentMethod": "card",
                "totalPrice": "29.99",
            })),
        ),
    )
    .await;
    let checkout_id = checkout["id"].as_str().expect("id").to_owned();
    send(
        &router,
        request(
            "PUT",
            &format!("/api/checkout/{checkout_id}/pay"),
            Some(&token),
            Some(json!({ "paymentStatus": "paid" })),
        ),
    )
    .await;
    let (_, order) = send(
        &router,
        request(
            "POST",
            &format!("/api/checkout/{checkout_id}/finalize"),
            Some(&token),
            None,
        ),
    )
    .await;
    let order_id = order["id"].as_str().expect("order id").to_owned();

    let admin = state
        .stores()
        .users
        .create(NewUser {
            name: "Root".to_owned(),
            email: threadline_core::Email::parse("root@example.com").expect("email"),
            password_hash: "unused".to_owned(),
            role: UserRole::Admin,
        })
        .await
        .expect("seed admin");
    let admin_token = state
        .auth()
        .issue_token(admin.id, admin.role)
        .expect("token");

    // Owners cannot run admin order operations.
    let (status, _) = send(
        &router,
        request(
            "PUT",
            &format!("/api/admin/orders/{order_id}"),
            Some(&token),
            Some(json!({ "status": "Delivered" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, delivered) = send(
        &router,
        request(
            "PUT",
            &format!("/api/admin/orders/{order_id}"),
            Some(&admin_token),
            Some(json!({ "status": "Delivered" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["status"], "Delivered");
    assert_eq!(delivered["isDelivered"], true);
    assert!(delivered["deliveredAt"].as_str().is_some());

    // Moving back to Shipped clears the delivery stamp.
    let (status, shipped) = send(
        &router,
        request(
            "PUT",
            &format!("/api/admin/orders/{order_id}"),
            Some(&admin_token),
            Some(json!({ "status": "Shipped" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "Shipped");
    assert_eq!(shipped["isDelivered"], false);

    let (status, body) = send(
        &router,
        request(
            "DELETE",
            &format!("/api/admin/orders/{order_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order deleted");
}

#[tokio::test]
async fn test_products_and_subscribe() {
    use threadline_api::db::NewUser;
    use threadline_core::UserRole;

    let (router, state) = app().await;
    seed_product(&state, "linen-shirt", "29.99").await;

    // The catalog listing is admin only.
    let (status, _) = send(&router, request("GET", "/api/admin/products", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = state
        .stores()
        .users
        .create(NewUser {
            name: "Root".to_owned(),
            email: threadline_core::Email::parse("root@example.com").expect("email"),
            password_hash: "unused".to_owned(),
            role: UserRole::Admin,
        })
        .await
        .expect("seed admin");
    let admin_token = state
        .auth()
        .issue_token(admin.id, admin.role)
        .expect("token");

    let (status, products) = send(
        &router,
        request("GET", "/api/admin/products", Some(&admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let products = products.as_array().expect("list");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "linen-shirt");
    assert_eq!(products[0]["price"], "29.99");

    // Newsletter signup, then the duplicate rejection.
    let (status, body) = send(
        &router,
        request(
            "POST",
            "/api/subscribe",
            None,
            Some(json!({ "email": "ada@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(
        &router,
        request(
            "POST",
            "/api/subscribe",
            None,
            Some(json!({ "email": "ada@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already subscribed");
}
