mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;

use common::{Auth, TestApp};
use foodhub_api::db::now;
use foodhub_api::services::{guest_service, maintenance_service};

async fn start_session(app: &TestApp) -> (String, String) {
    let (status, body) = app.call(Method::POST, "/api/shop/guest/session", Auth::None, None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let session = guest_service::resolve(&app.state.pool, &token).await.unwrap();
    (token, session.user_id)
}

async fn expire(app: &TestApp, token: &str) {
    sqlx::query("UPDATE guest_sessions SET expires_at = ? WHERE token = ?")
        .bind(now() - Duration::minutes(5))
        .bind(token)
        .execute(&app.state.pool)
        .await
        .unwrap();
}

async fn count(app: &TestApp, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(&app.state.pool).await.unwrap()
}

#[tokio::test]
async fn expired_session_is_refused() {
    let app = TestApp::new().await;
    let (token, _) = start_session(&app).await;

    let (status, body) = app.call(Method::GET, "/api/shop/guest/session", Auth::Guest(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["expires_at"].is_string());

    expire(&app, &token).await;
    let (status, body) = app.call(Method::GET, "/api/shop/guest/session", Auth::Guest(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Guest session expired, please start a new one");
    let (status, _) = app.call(Method::GET, "/api/shop/cart", Auth::Guest(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn purge_drops_expired_guests_but_keeps_buyers() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Snacks", true).await;
    let samosa = app.menu_item(&menu, "Samosa", 300, 50).await;

    let (browser, browser_id) = start_session(&app).await;
    let (buyer, buyer_id) = start_session(&app).await;
    let (active, active_id) = start_session(&app).await;
    for token in [&browser, &buyer, &active] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/shop/cart/items",
                Auth::Guest(token),
                Some(json!({ "item_id": samosa.id, "quantity": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/guest/checkout",
            Auth::Guest(&buyer),
            Some(json!({
                "name": "Passer By",
                "phone": "+91 91234 56789",
                "delivery_address": {
                    "line1": "4 Park Street",
                    "city": "Kolkata",
                    "state": "West Bengal",
                    "postal_code": "700016"
                },
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    expire(&app, &browser).await;
    expire(&app, &buyer).await;
    assert_eq!(guest_service::purge_expired(&app.state.pool).await.unwrap(), 2);

    let remaining: Vec<String> = sqlx::query_scalar("SELECT user_id FROM guest_sessions")
        .fetch_all(&app.state.pool)
        .await
        .unwrap();
    assert_eq!(remaining, vec![active_id.clone()]);

    let guests: Vec<String> = sqlx::query_scalar("SELECT id FROM users WHERE role = 'guest' ORDER BY id")
        .fetch_all(&app.state.pool)
        .await
        .unwrap();
    assert!(!guests.contains(&browser_id));
    assert!(guests.contains(&buyer_id), "a guest with orders is kept");
    assert!(guests.contains(&active_id));

    assert_eq!(count(&app, "SELECT COUNT(*) FROM carts").await, 1);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM orders").await, 1);

    let (status, body) = app.call(Method::GET, "/api/shop/cart", Auth::Guest(&active), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["item_count"], 2);

    // nothing left to purge
    maintenance_service::run_once(&app.state.pool).await.unwrap();
    assert_eq!(count(&app, "SELECT COUNT(*) FROM guest_sessions").await, 1);
}
