mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{Auth, Part, TestApp};
use foodhub_api::rbac::Role;
use foodhub_api::routes::MAX_IMAGE_BYTES;

fn png(name: &str) -> Part {
    Part::file("images", name, "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
}

fn paneer(category_id: &str) -> Value {
    json!({
        "name": "Paneer Tikka",
        "category_id": category_id,
        "is_vegetarian": true,
        "price": 900,
        "stock": 10
    })
}

#[tokio::test]
async fn multipart_create_stores_every_image() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    let (status, body) = app
        .call_multipart(
            Method::POST,
            "/api/admin/menu",
            &admin,
            vec![Part::json("data", &paneer(&menu.id)), png("front.png"), png("side.png")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["name"], "Paneer Tikka");
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["public_id"], "menu/front.png");
    assert_eq!(images[1]["url"], "https://images.test/menu/side.png");
    assert_eq!(*app.images.uploaded.lock().unwrap(), vec!["menu/front.png", "menu/side.png"]);

    // the wildcard route keeps the folder in the public id
    let id = body["data"]["id"].as_str().unwrap();
    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/menu/{id}/images/menu/front.png"),
            Auth::Bearer(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);
    assert_eq!(app.deleted_images(1).await, vec!["menu/front.png"]);
}

#[tokio::test]
async fn non_image_parts_are_rejected() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    let (status, body) = app
        .call_multipart(
            Method::POST,
            "/api/admin/menu",
            &admin,
            vec![
                Part::json("data", &paneer(&menu.id)),
                Part::file("images", "notes.txt", "text/plain", b"hello".to_vec()),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only image files are allowed");
    assert!(app.images.uploaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_images_are_rejected() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    let (status, body) = app
        .call_multipart(
            Method::POST,
            "/api/admin/menu",
            &admin,
            vec![
                Part::json("data", &paneer(&menu.id)),
                Part::file("image", "huge.jpg", "image/jpeg", vec![0u8; MAX_IMAGE_BYTES + 1]),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("exceeds the 5 MB limit"), "{body}");
    assert!(app.images.uploaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_upload_aborts_create_and_rolls_back() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let admin = app.token_for(Role::SuperAdmin).await;
    app.images.fail_uploads_after(1);

    let (status, body) = app
        .call_multipart(
            Method::POST,
            "/api/admin/menu",
            &admin,
            vec![Part::json("data", &paneer(&menu.id)), png("front.png"), png("side.png")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Image upload failed");
    assert_eq!(*app.images.deleted.lock().unwrap(), vec!["menu/front.png"]);

    let (_, body) = app.call(Method::GET, "/api/admin/menu", Auth::Bearer(&admin), None).await;
    assert_eq!(body["data"]["pagination"]["total_items"], 0);
}

#[tokio::test]
async fn failed_upload_leaves_item_unchanged() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let item = app.menu_item(&menu, "Hara Bhara Kebab", 700, 10).await;
    let admin = app.token_for(Role::SuperAdmin).await;
    app.images.fail_uploads_after(0);

    let uri = format!("/api/admin/menu/{}", item.id);
    let (status, _) = app
        .call_multipart(
            Method::PUT,
            &uri,
            &admin,
            vec![Part::json("data", &json!({ "name": "Kebab Platter" })), png("platter.png")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.call(Method::GET, &uri, Auth::Bearer(&admin), None).await;
    assert_eq!(body["data"]["name"], "Hara Bhara Kebab");
    assert!(body["data"]["images"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_succeeds_when_image_cleanup_fails() {
    let app = TestApp::new().await;
    let (_, menu) = app.menu_category("Starters", true).await;
    let admin = app.token_for(Role::SuperAdmin).await;

    let (status, body) = app
        .call_multipart(
            Method::POST,
            "/api/admin/menu",
            &admin,
            vec![Part::json("data", &paneer(&menu.id)), png("front.png"), png("side.png")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let uri = format!("/api/admin/menu/{}", body["data"]["id"].as_str().unwrap());
    app.images.fail_deletes();

    let (status, body) = app.call(Method::DELETE, &uri, Auth::Bearer(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let mut attempted = app.deleted_images(2).await;
    attempted.sort();
    assert_eq!(attempted, vec!["menu/front.png", "menu/side.png"]);
    let (status, _) = app.call(Method::GET, &uri, Auth::Bearer(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
