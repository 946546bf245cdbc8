use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::AppState;
use crate::auth::GuestUser;
use crate::error::AppResult;
use crate::models::cart::CartView;
use crate::models::common::ApiResponse;
use crate::models::order::{GuestCheckoutReq, OrderDetail};
use crate::routes::ValidJson;
use crate::services::{cart_service, guest_service};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(start).get(show))
        .route("/checkout", post(checkout))
}

#[derive(Debug, Serialize)]
struct SessionView {
    token: String,
    expires_at: DateTime<Utc>,
    cart: CartView,
}

async fn start(State(state): State<AppState>) -> AppResult<(StatusCode, Json<ApiResponse<SessionView>>)> {
    let session = guest_service::start(&state.pool, state.config.guest_session_ttl_hours).await?;
    let cart = cart_service::view(&state.pool, &session.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Guest session started",
            SessionView {
                token: session.token,
                expires_at: session.expires_at,
                cart,
            },
        )),
    ))
}

async fn show(guest: GuestUser, State(state): State<AppState>) -> AppResult<Json<ApiResponse<SessionView>>> {
    let cart = cart_service::view(&state.pool, &guest.user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Guest session active",
        SessionView {
            token: guest.token,
            expires_at: guest.expires_at,
            cart,
        },
    )))
}

async fn checkout(
    guest: GuestUser,
    State(state): State<AppState>,
    ValidJson(req): ValidJson<GuestCheckoutReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderDetail>>)> {
    let detail = guest_service::checkout(&state.pool, &state.config, &state.mailer, &guest.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Order placed", detail))))
}
