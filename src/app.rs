use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::middleware::rate_limit::{self, RateLimiter};
use crate::oauth::GoogleOAuth;
use crate::routes;
use crate::services::image_store::ImageStore;
use crate::services::mailer::Mailer;

const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtKeys>,
    pub images: Arc<dyn ImageStore>,
    pub mailer: Arc<dyn Mailer>,
    pub api_limiter: Arc<RateLimiter>,
    pub auth_limiter: Arc<RateLimiter>,
    pub google: Option<Arc<GoogleOAuth>>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        images: Arc<dyn ImageStore>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let google = config
            .google
            .as_ref()
            .map(GoogleOAuth::new)
            .transpose()?
            .map(Arc::new);
        Ok(Self {
            pool,
            jwt: Arc::new(JwtKeys::new(&config.jwt_secret, config.jwt_ttl_hours)),
            api_limiter: Arc::new(RateLimiter::new(config.api_rate_limit.into())),
            auth_limiter: Arc::new(RateLimiter::new(config.auth_rate_limit.into())),
            config: Arc::new(config),
            images,
            mailer,
            google,
        })
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = routes::auth::router().layer(from_fn_with_state(
        state.auth_limiter.clone(),
        rate_limit::enforce,
    ));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", routes::admin::router())
        .nest("/shop", routes::shop::router())
        .layer(from_fn_with_state(state.api_limiter.clone(), rate_limit::enforce));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-guest-session"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}
