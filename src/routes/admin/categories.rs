use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::{AppError, AppResult};
use crate::models::category::{Category, CategoryQuery, CreateCategoryReq, UpdateCategoryReq};
use crate::models::common::{ApiResponse, Paginated};
use crate::rbac::{ensure_can, role_filter, Action};
use crate::routes::{PathParam, QueryParams, WithImages};
use crate::services::category_service;
use crate::validation::Validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/image", post(upload_image))
}

async fn list(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<CategoryQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Category>>>> {
    let page = category_service::list(&state.pool, role_filter(admin.role), &q).await?;
    Ok(Json(ApiResponse::ok("Categories fetched", page)))
}

async fn show(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = category_service::get(&state.pool, &id).await?;
    ensure_can(admin.role, Action::View, category.is_vegetarian, "categories")?;
    Ok(Json(ApiResponse::ok("Category fetched", category)))
}

async fn create(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    payload: WithImages<CreateCategoryReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    payload.data.validate()?;
    let image = payload.images.into_iter().next();
    let category = category_service::create(&state.pool, &state.images, admin.role, &payload.data, image).await?;
    tracing::info!(category_id = %category.id, admin_id = %admin.id, "category created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Category created", category))))
}

async fn update(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    payload: WithImages<UpdateCategoryReq>,
) -> AppResult<Json<ApiResponse<Category>>> {
    payload.data.validate()?;
    let image = payload.images.into_iter().next();
    let category = category_service::update(&state.pool, &state.images, admin.role, &id, &payload.data, image).await?;
    Ok(Json(ApiResponse::ok("Category updated", category)))
}

async fn remove(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    category_service::delete(&state.pool, &state.images, admin.role, &id).await?;
    tracing::info!(category_id = %id, admin_id = %admin.id, "category deleted");
    Ok(Json(ApiResponse::message("Category deleted")))
}

/// Replaces the category image; the previous one is deleted from the store.
async fn upload_image(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    payload: WithImages<UpdateCategoryReq>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let image = payload
        .images
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No image provided".into()))?;
    let category = category_service::update(
        &state.pool,
        &state.images,
        admin.role,
        &id,
        &UpdateCategoryReq::default(),
        Some(image),
    )
    .await?;
    Ok(Json(ApiResponse::ok("Category image updated", category)))
}
