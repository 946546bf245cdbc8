use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::{AdminUser, SuperAdmin};
use crate::error::AppResult;
use crate::export::Csv;
use crate::models::common::{ApiResponse, Paginated};
use crate::models::user::{UpdateRoleReq, User, UserQuery};
use crate::routes::{JsonBody, PathParam, QueryParams};
use crate::services::user_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/export", get(export))
        .route("/:id", get(show).delete(deactivate))
        .route("/:id/role", put(update_role))
}

async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<UserQuery>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let page = user_service::list(&state.pool, &q).await?;
    Ok(Json(ApiResponse::ok("Users fetched", page)))
}

async fn show(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_service::get(&state.pool, &id).await?;
    Ok(Json(ApiResponse::ok("User fetched", user)))
}

async fn update_role(
    SuperAdmin(actor): SuperAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(req): JsonBody<UpdateRoleReq>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_service::update_role(&state.pool, &actor.id, &id, req.role).await?;
    tracing::info!(user_id = %user.id, role = %user.role, actor_id = %actor.id, "user role changed");
    Ok(Json(ApiResponse::ok("User role updated", user)))
}

async fn deactivate(
    SuperAdmin(actor): SuperAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_service::deactivate(&state.pool, &actor.id, &id).await?;
    tracing::info!(user_id = %user.id, actor_id = %actor.id, "user deactivated");
    Ok(Json(ApiResponse::ok("User deactivated", user)))
}

async fn export(_actor: SuperAdmin, State(state): State<AppState>) -> AppResult<Response> {
    let users = user_service::export(&state.pool).await?;
    let mut csv = Csv::new(&["name", "email", "phone", "role", "status", "created_at"]);
    for user in users {
        csv.row([
            user.name,
            user.email.unwrap_or_default(),
            user.phone.unwrap_or_default(),
            user.role.as_str().to_string(),
            user.status.as_str().to_string(),
            user.created_at.to_rfc3339(),
        ]);
    }
    Ok(csv.into_download("users.csv"))
}
