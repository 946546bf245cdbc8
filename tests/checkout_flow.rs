mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{Auth, TestApp};
use foodhub_api::error::AppError;
use foodhub_api::models::catalog::CatalogKind;
use foodhub_api::models::order::OrderStatus;
use foodhub_api::rbac::Role;
use foodhub_api::services::{catalog_service, order_service};

fn address() -> Value {
    json!({
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "postal_code": "560001"
    })
}

async fn stock_of(app: &TestApp, id: &str) -> i64 {
    catalog_service::get(&app.state.pool, CatalogKind::MenuItem, id).await.unwrap().stock
}

#[tokio::test]
async fn customer_checkout_places_order() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Mains", true).await;
    let thali = app.menu_item(&menu, "Veg Thali", 1200, 10).await;
    let (customer, token) = app.user(Role::Customer, "diner@example.com").await;

    app.call(
        Method::POST,
        "/api/shop/cart/items",
        Auth::Bearer(&token),
        Some(json!({ "item_id": thali.id, "quantity": 3 })),
    )
    .await;
    app.call(Method::POST, "/api/shop/cart/coupon", Auth::Bearer(&token), Some(json!({ "code": "SAVE10" })))
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&token),
            Some(json!({ "delivery_address": address(), "payment_method": "cod" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"]["order"];
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["user_id"], customer.id.as_str());
    assert_eq!(order["subtotal"], 3600);
    assert_eq!(order["discount"], 360);
    assert_eq!(order["total"], 3240 + app.state.config.delivery_fee);
    assert_eq!(order["coupon_code"], "SAVE10");
    assert_eq!(order["status"], "pending");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["status_history"][0]["status"], "pending");

    assert_eq!(stock_of(&app, &thali.id).await, 7);

    let (_, cart) = app.call(Method::GET, "/api/shop/cart", Auth::Bearer(&token), None).await;
    assert!(cart["data"]["items"].as_array().unwrap().is_empty());
    assert!(cart["data"]["coupon_code"].is_null());

    let emails = app.sent_emails(1).await;
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to, "diner@example.com");

    let (status, body) = app.call(Method::GET, "/api/shop/orders", Auth::Bearer(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let token = app.token_for(Role::Customer).await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&token),
            Some(json!({ "delivery_address": address(), "payment_method": "card" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Your cart is empty");
}

#[tokio::test]
async fn status_follows_the_transition_table() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Grill", false).await;
    let tikka = app.menu_item(&menu, "Chicken Tikka", 1500, 5).await;
    let token = app.token_for(Role::Customer).await;
    let admin = app.token_for(Role::NonVegAdmin).await;

    app.call(
        Method::POST,
        "/api/shop/cart/items",
        Auth::Bearer(&token),
        Some(json!({ "item_id": tikka.id, "quantity": 2 })),
    )
    .await;
    let (_, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&token),
            Some(json!({ "delivery_address": address(), "payment_method": "cod" })),
        )
        .await;
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/orders/{order_id}/status");

    let (status, _) = app
        .call(Method::PUT, &uri, Auth::Bearer(&admin), Some(json!({ "status": "delivered" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for next in ["confirmed", "preparing", "out-for-delivery", "delivered"] {
        let (status, body) = app
            .call(Method::PUT, &uri, Auth::Bearer(&admin), Some(json!({ "status": next })))
            .await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
    }

    let (_, body) = app
        .call(Method::GET, &format!("/api/admin/orders/{order_id}"), Auth::Bearer(&admin), None)
        .await;
    assert_eq!(body["data"]["order"]["payment_status"], "paid");
    assert_eq!(body["data"]["status_history"].as_array().unwrap().len(), 5);

    let (status, _) = app
        .call(Method::PUT, &uri, Auth::Bearer(&admin), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_cancel_restores_stock() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Sweets", true).await;
    let ladoo = app.menu_item(&menu, "Ladoo", 200, 10).await;
    let token = app.token_for(Role::Customer).await;
    let other = app.user(Role::Customer, "someone@example.com").await.1;

    app.call(
        Method::POST,
        "/api/shop/cart/items",
        Auth::Bearer(&token),
        Some(json!({ "item_id": ladoo.id, "quantity": 4 })),
    )
    .await;
    let (_, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&token),
            Some(json!({ "delivery_address": address(), "payment_method": "upi" })),
        )
        .await;
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&app, &ladoo.id).await, 6);

    let uri = format!("/api/shop/orders/{order_id}/cancel");
    let (status, _) = app.call(Method::POST, &uri, Auth::Bearer(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call(Method::POST, &uri, Auth::Bearer(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"]["status"], "cancelled");
    assert_eq!(stock_of(&app, &ladoo.id).await, 10);

    let (status, _) = app.call(Method::POST, &uri, Auth::Bearer(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn place_order(app: &TestApp, token: &str, item_id: &str, quantity: i64) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/cart/items",
            Auth::Bearer(token),
            Some(json!({ "item_id": item_id, "quantity": quantity })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(token),
            Some(json!({ "delivery_address": address(), "payment_method": "card" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["order"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn concurrent_cancels_restock_once() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Breads", true).await;
    let naan = app.menu_item(&menu, "Butter Naan", 150, 10).await;
    let token = app.token_for(Role::Customer).await;
    let (admin, _) = app.user(Role::SuperAdmin, "owner@example.com").await;

    let order_id = place_order(&app, &token, &naan.id, 4).await;
    assert_eq!(stock_of(&app, &naan.id).await, 6);

    let pool = &app.state.pool;
    let (a, b) = tokio::join!(
        order_service::update_status(pool, &order_id, OrderStatus::Cancelled, None, &admin.id),
        order_service::update_status(pool, &order_id, OrderStatus::Cancelled, None, &admin.id),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "exactly one cancel must win");
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, AppError::Conflict(_) | AppError::BadRequest(_)), "{err:?}");

    assert_eq!(stock_of(&app, &naan.id).await, 10);
    let detail = order_service::detail(pool, &order_id).await.unwrap();
    assert_eq!(detail.order.status, OrderStatus::Cancelled);
    assert_eq!(detail.status_history.len(), 2);
}

#[tokio::test]
async fn cancel_returns_only_what_checkout_took() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Desserts", true).await;
    let kulfi = app.menu_item(&menu, "Kulfi", 250, 5).await;
    let token = app.token_for(Role::Customer).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    app.call(
        Method::POST,
        "/api/shop/cart/items",
        Auth::Bearer(&token),
        Some(json!({ "item_id": kulfi.id, "quantity": 5 })),
    )
    .await;
    // stock drops after the item is already in the cart
    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/admin/menu/{}/stock", kulfi.id),
            Auth::Bearer(&admin),
            Some(json!({ "stock": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&token),
            Some(json!({ "delivery_address": address(), "payment_method": "cod" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["items"][0]["quantity"], 5);
    assert_eq!(stock_of(&app, &kulfi.id).await, 0);

    let order_id = body["data"]["order"]["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::POST, &format!("/api/shop/orders/{order_id}/cancel"), Auth::Bearer(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock_of(&app, &kulfi.id).await, 2);
}

#[tokio::test]
async fn guest_session_checkout() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Wraps", true).await;
    let wrap = app.menu_item(&menu, "Falafel Wrap", 800, 10).await;

    let (status, body) = app.call(Method::POST, "/api/shop/guest/session", Auth::None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let guest = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/cart/items",
            Auth::Guest(&guest),
            Some(json!({ "item_id": wrap.id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app.call(Method::GET, "/api/shop/guest/session", Auth::Guest(&guest), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cart"]["item_count"], 2);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/guest/checkout",
            Auth::Guest(&guest),
            Some(json!({
                "name": "Walk In",
                "email": "walkin@example.com",
                "phone": "+91 90000 00000",
                "delivery_address": address(),
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["order"]["is_guest"], true);
    assert_eq!(body["data"]["order"]["customer_email"], "walkin@example.com");
    assert_eq!(body["data"]["order"]["customer_name"], "Walk In");

    let (status, _) = app.call(Method::GET, "/api/shop/cart", Auth::Guest("unknown-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
