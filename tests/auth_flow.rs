mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{Auth, TestApp, PASSWORD};
use foodhub_api::rbac::Role;

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Auth::None,
            Some(json!({ "name": "Meera", "email": "Meera@Example.com", "password": "tandoori-nights" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user"]["email"], "meera@example.com");
    assert_eq!(body["data"]["user"]["role"], "customer");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Auth::None,
            Some(json!({ "name": "Meera", "email": "meera@example.com", "password": "tandoori-nights" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Auth::None,
            Some(json!({ "email": "meera@example.com", "password": "tandoori-nights" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/api/auth/me", Auth::Bearer(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Meera");
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = TestApp::new().await;
    app.user(Role::Customer, "known@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Auth::None,
            Some(json!({ "email": "known@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Auth::None,
            Some(json!({ "email": "known@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn registration_is_validated() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Auth::None,
            Some(json!({ "name": "", "email": "nope", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    let (status, _) = app
        .call(Method::POST, "/api/auth/register", Auth::None, Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn google_sign_in_needs_configuration() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::GET, "/api/auth/google", Auth::None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
