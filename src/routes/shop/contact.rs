use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::app::AppState;
use crate::error::AppResult;
use crate::models::common::ApiResponse;
use crate::models::contact::{ContactMessage, ContactReq};
use crate::routes::ValidJson;
use crate::services::contact_service;
use crate::services::mailer::{self, send_in_background};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}

async fn submit(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ContactReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContactMessage>>)> {
    let message = contact_service::create(&state.pool, &req).await?;
    send_in_background(
        state.mailer.clone(),
        mailer::contact_acknowledgement(&message.email, &message.name, &message.subject),
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Message sent", message))))
}
