use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::models::common::{ApiResponse, Paginated};
use crate::models::contact::{ContactMessage, ContactQuery, ContactStatusReq};
use crate::routes::{JsonBody, PathParam, QueryParams};
use crate::services::contact_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(show).delete(remove))
        .route("/:id/status", put(update_status))
}

async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<ContactQuery>,
) -> AppResult<Json<ApiResponse<Paginated<ContactMessage>>>> {
    let page = contact_service::list(&state.pool, &q).await?;
    Ok(Json(ApiResponse::ok("Messages fetched", page)))
}

async fn show(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<ContactMessage>>> {
    let message = contact_service::get(&state.pool, &id).await?;
    Ok(Json(ApiResponse::ok("Message fetched", message)))
}

async fn update_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(req): JsonBody<ContactStatusReq>,
) -> AppResult<Json<ApiResponse<ContactMessage>>> {
    let message = contact_service::update_status(&state.pool, &id, req.status).await?;
    Ok(Json(ApiResponse::ok("Message status updated", message)))
}

async fn remove(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    contact_service::delete(&state.pool, &id).await?;
    Ok(Json(ApiResponse::message("Message deleted")))
}
