use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{clear_cookie, session_cookie, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::common::ApiResponse;
use crate::models::user::{AuthResponse, LoginReq, RegisterReq, User};
use crate::routes::{QueryParams, ValidJson};
use crate::services::auth_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/google", get(google_start))
        .route("/google/callback", get(google_callback))
}

/// Issues a JWT for `user` and returns it both in the body and as a cookie.
fn signed_in(state: &AppState, status: StatusCode, message: &str, user: User) -> AppResult<Response> {
    let token = state.jwt.issue(&user)?;
    let cookie = session_cookie(&token, state.jwt.ttl_secs());
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::ok(message, AuthResponse { token, user })),
    )
        .into_response())
}

async fn register(State(state): State<AppState>, ValidJson(req): ValidJson<RegisterReq>) -> AppResult<Response> {
    let user = auth_service::register(&state.pool, state.config.bcrypt_cost, &req).await?;
    signed_in(&state, StatusCode::CREATED, "Registration successful", user)
}

async fn login(State(state): State<AppState>, ValidJson(req): ValidJson<LoginReq>) -> AppResult<Response> {
    let user = auth_service::login(&state.pool, &req).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
    signed_in(&state, StatusCode::OK, "Login successful", user)
}

async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_cookie())],
        Json(ApiResponse::message("Logged out")),
    )
}

async fn me(auth: AuthUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok("Current user", auth.user))
}

async fn google_start(State(state): State<AppState>) -> AppResult<Redirect> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".into()))?;
    Ok(Redirect::to(&google.start().await))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn google_callback(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CallbackParams>,
) -> AppResult<Response> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".into()))?;
    if let Some(error) = params.error {
        return Err(AppError::Unauthorized(format!("Google sign-in was cancelled: {error}")));
    }
    let (Some(code), Some(csrf_state)) = (params.code, params.state) else {
        return Err(AppError::BadRequest("Missing code or state".into()));
    };

    let profile = google.callback(code, csrf_state).await?;
    let user = auth_service::upsert_oauth_user(&state.pool, &profile).await?;
    tracing::info!(user_id = %user.id, "google sign-in completed");
    signed_in(&state, StatusCode::OK, "Login successful", user)
}
