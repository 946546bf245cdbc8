#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use foodhub_api::app::{build_router, AppState};
use foodhub_api::auth::{hash_password, GUEST_HEADER};
use foodhub_api::config::Config;
use foodhub_api::db;
use foodhub_api::models::catalog::{CatalogItem, CatalogKind, CreateItemReq};
use foodhub_api::models::category::{Category, CategoryType, CreateCategoryReq};
use foodhub_api::models::catalog::ImageRef;
use foodhub_api::models::user::{AuthProvider, User};
use foodhub_api::rbac::Role;
use foodhub_api::services::image_store::{ImageStore, ImageUpload};
use foodhub_api::services::mailer::{Email, Mailer};
use foodhub_api::services::user_service::{self, NewUser};
use foodhub_api::services::{catalog_service, category_service};

pub const PASSWORD: &str = "correct-horse";

/// Records every call. Uploads start failing once `uploads_before_failure`
/// have succeeded; deletes fail while `fail_deletes` is set, after being
/// recorded.
pub struct RecordingImageStore {
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub uploads_before_failure: AtomicUsize,
    pub fail_deletes: AtomicBool,
}

impl Default for RecordingImageStore {
    fn default() -> Self {
        RecordingImageStore {
            uploaded: Mutex::default(),
            deleted: Mutex::default(),
            uploads_before_failure: AtomicUsize::new(usize::MAX),
            fail_deletes: AtomicBool::new(false),
        }
    }
}

impl RecordingImageStore {
    pub fn fail_uploads_after(&self, successes: usize) {
        self.uploads_before_failure.store(successes, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> anyhow::Result<ImageRef> {
        let mut uploaded = self.uploaded.lock().unwrap();
        if uploaded.len() >= self.uploads_before_failure.load(Ordering::SeqCst) {
            anyhow::bail!("image host unavailable");
        }
        let public_id = format!("{folder}/{}", image.file_name);
        uploaded.push(public_id.clone());
        Ok(ImageRef {
            url: format!("https://images.test/{public_id}"),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("image host unavailable");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub images: Arc<RecordingImageStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            bcrypt_cost: 4,
            ..Config::default()
        };
        let pool = db::connect(&config.database_url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let images = Arc::new(RecordingImageStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(pool, config, images.clone(), mailer.clone()).unwrap();
        TestApp {
            router: build_router(state.clone()),
            state,
            images,
            mailer,
        }
    }

    pub async fn user(&self, role: Role, email: &str) -> (User, String) {
        let hash = hash_password(PASSWORD, 4).unwrap();
        let user = user_service::insert(
            &self.state.pool,
            NewUser {
                name: "Test User",
                email: Some(email),
                phone: Some("+91 98765 43210"),
                password_hash: Some(&hash),
                role,
                auth_provider: AuthProvider::Local,
            },
        )
        .await
        .unwrap();
        let token = self.state.jwt.issue(&user).unwrap();
        (user, token)
    }

    pub async fn token_for(&self, role: Role) -> String {
        let email = format!("{}@example.com", role.as_str());
        self.user(role, &email).await.1
    }

    /// A parent category plus one menu category under it.
    pub async fn menu_category(&self, name: &str, veg: bool) -> (Category, Category) {
        let parent = category_service::create(
            &self.state.pool,
            &self.state.images,
            Role::SuperAdmin,
            &CreateCategoryReq {
                name: format!("{name} Parent"),
                description: None,
                category_type: CategoryType::Parent,
                parent_id: None,
                is_vegetarian: Some(veg),
                is_active: None,
                sort_order: None,
            },
            None,
        )
        .await
        .unwrap();
        let menu = category_service::create(
            &self.state.pool,
            &self.state.images,
            Role::SuperAdmin,
            &CreateCategoryReq {
                name: name.into(),
                description: None,
                category_type: CategoryType::Menu,
                parent_id: Some(parent.id.clone()),
                is_vegetarian: None,
                is_active: None,
                sort_order: None,
            },
            None,
        )
        .await
        .unwrap();
        (parent, menu)
    }

    pub async fn menu_item(&self, category: &Category, name: &str, price: i64, stock: i64) -> CatalogItem {
        catalog_service::create(
            &self.state.pool,
            &self.state.images,
            Role::SuperAdmin,
            CatalogKind::MenuItem,
            &item_req(name, &category.id, category.is_vegetarian, price, stock),
            Vec::new(),
        )
        .await
        .unwrap()
    }

    pub async fn call(&self, method: Method, uri: &str, auth: Auth<'_>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        builder = match auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            Auth::Guest(token) => builder.header(GUEST_HEADER, token),
        };
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }

    /// Sends `multipart/form-data` built from `parts`.
    pub async fn call_multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: Vec<Part>,
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "foodhub-test-boundary";
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match &part.file_name {
                Some(file) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{file}\"\r\n",
                        part.name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
                ),
            }
            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Waits for background image deletes to reach `count` calls.
    pub async fn deleted_images(&self, count: usize) -> Vec<String> {
        for _ in 0..50 {
            if self.images.deleted.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.images.deleted.lock().unwrap().clone()
    }

    /// Waits for background email tasks to deliver `count` messages.
    pub async fn sent_emails(&self, count: usize) -> Vec<Email> {
        for _ in 0..50 {
            if self.mailer.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent.lock().unwrap().clone()
    }
}

pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Part {
    pub fn json(name: &str, value: &Value) -> Self {
        Part {
            name: name.into(),
            file_name: None,
            content_type: Some("application/json".into()),
            bytes: value.to_string().into_bytes(),
        }
    }

    pub fn file(name: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Part {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            bytes,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Guest(&'a str),
}

pub fn item_req(name: &str, category_id: &str, veg: bool, price: i64, stock: i64) -> CreateItemReq {
    CreateItemReq {
        name: name.into(),
        description: None,
        category_id: category_id.into(),
        is_vegetarian: veg,
        price,
        discounted_price: None,
        stock,
        sizes: Vec::new(),
        addons: Vec::new(),
        tags: Vec::new(),
        spicy_level: None,
        preparation_time: None,
        is_active: None,
        is_featured: None,
    }
}
