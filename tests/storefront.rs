mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{Auth, TestApp};
use foodhub_api::rbac::Role;

#[tokio::test]
async fn shop_lists_only_active_items() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Soups", true).await;
    let tomato = app.menu_item(&menu, "Tomato Soup", 400, 10).await;
    let hidden = app.menu_item(&menu, "Hidden Soup", 400, 10).await;
    let admin = app.token_for(Role::SuperAdmin).await;
    app.call(
        Method::PUT,
        &format!("/api/admin/menu/{}", hidden.id),
        Auth::Bearer(&admin),
        Some(json!({ "is_active": false })),
    )
    .await;

    let (status, body) = app
        .call(Method::GET, &format!("/api/shop/menu?category={}", menu.slug), Auth::None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], tomato.id.as_str());

    let (status, _) = app
        .call(Method::GET, &format!("/api/shop/menu/{}", hidden.id), Auth::None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call(Method::GET, "/api/shop/categories?vegetarian=true", Auth::None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn newsletter_subscription_lifecycle() {
    let app = TestApp::new().await;
    let body = json!({ "email": "Fan@Example.com" });

    let (status, resp) = app.call(Method::POST, "/api/shop/newsletter/subscribe", Auth::None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["email"], "fan@example.com");

    let (status, _) = app.call(Method::POST, "/api/shop/newsletter/subscribe", Auth::None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call(Method::POST, "/api/shop/newsletter/unsubscribe", Auth::None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::POST, "/api/shop/newsletter/subscribe", Auth::None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let emails = app.sent_emails(2).await;
    assert_eq!(emails.len(), 2);
    assert!(emails.iter().all(|e| e.to == "fan@example.com"));
}

#[tokio::test]
async fn contact_messages_reach_admins() {
    let app = TestApp::new().await;
    let admin = app.token_for(Role::VegAdmin).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shop/contact",
            Auth::None,
            Some(json!({
                "name": "Ravi",
                "email": "ravi@example.com",
                "subject": "Catering",
                "message": "Do you cater for 50 people?"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/api/admin/contacts?status=new", Auth::Bearer(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_items"], 1);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/admin/contacts/{id}/status"),
            Auth::Bearer(&admin),
            Some(json!({ "status": "read" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "read");
}

#[tokio::test]
async fn reports_and_exports() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Mains", true).await;
    let dish = app.menu_item(&menu, "Chole Bhature", 1000, 10).await;
    let customer = app.token_for(Role::Customer).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    app.call(
        Method::POST,
        "/api/shop/cart/items",
        Auth::Bearer(&customer),
        Some(json!({ "item_id": dish.id, "quantity": 2 })),
    )
    .await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/shop/orders",
            Auth::Bearer(&customer),
            Some(json!({
                "delivery_address": { "line1": "1 Park St", "city": "Kolkata", "postal_code": "700016" },
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.call(Method::GET, "/api/admin/reports/summary", Auth::Bearer(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_orders"], 1);
    assert_eq!(body["data"]["menu_items"], 1);

    let (_, body) = app.call(Method::GET, "/api/admin/reports/top-items", Auth::Bearer(&admin), None).await;
    assert_eq!(body["data"][0]["name"], "Chole Bhature");
    assert_eq!(body["data"][0]["quantity"], 2);

    let (_, body) = app.call(Method::GET, "/api/admin/reports/sales?days=7", Auth::Bearer(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.call(Method::GET, "/api/admin/orders/export", Auth::Bearer(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = body.as_str().unwrap();
    assert!(csv.starts_with("order_number,"));
    assert_eq!(csv.lines().count(), 2);
}
