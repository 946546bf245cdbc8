use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::app::AppState;
use crate::error::AppResult;
use crate::models::common::ApiResponse;
use crate::models::newsletter::{SubscribeReq, Subscriber};
use crate::routes::ValidJson;
use crate::services::mailer::{self, send_in_background};
use crate::services::newsletter_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

async fn subscribe(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubscribeReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<Subscriber>>)> {
    let subscriber = newsletter_service::subscribe(&state.pool, &req.email).await?;
    send_in_background(state.mailer.clone(), mailer::newsletter_welcome(&subscriber.email));
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Subscribed to the newsletter", subscriber))))
}

async fn unsubscribe(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubscribeReq>,
) -> AppResult<Json<ApiResponse<()>>> {
    newsletter_service::unsubscribe(&state.pool, &req.email).await?;
    Ok(Json(ApiResponse::message("Unsubscribed from the newsletter")))
}
