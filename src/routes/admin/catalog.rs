//! Shared handlers for `/menu` and `/products`; the mounted router carries
//! its [`CatalogKind`] as a request extension.
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::models::catalog::{CatalogItem, CatalogKind, CatalogQuery, CreateItemReq, StockUpdateReq, UpdateItemReq};
use crate::models::common::{ApiResponse, Paginated};
use crate::rbac::role_filter;
use crate::routes::{JsonBody, PathParam, QueryParams, WithImages};
use crate::services::catalog_service;
use crate::validation::Validate;

pub fn router(kind: CatalogKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/images", post(add_images))
        .route("/:id/images/*public_id", delete(remove_image))
        .route("/:id/stock", patch(update_stock))
        .layer(Extension(kind))
}

fn title(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::MenuItem => "Menu item",
        CatalogKind::Product => "Product",
    }
}

async fn list(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    QueryParams(q): QueryParams<CatalogQuery>,
) -> AppResult<Json<ApiResponse<Paginated<CatalogItem>>>> {
    let page = catalog_service::admin_list(&state.pool, kind, role_filter(admin.role), &q).await?;
    Ok(Json(ApiResponse::ok(format!("{} list fetched", title(kind)), page)))
}

async fn show(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::admin_get(&state.pool, kind, admin.role, &id).await?;
    Ok(Json(ApiResponse::ok(format!("{} fetched", title(kind)), item)))
}

async fn create(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    payload: WithImages<CreateItemReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogItem>>)> {
    payload.data.validate()?;
    let item =
        catalog_service::create(&state.pool, &state.images, admin.role, kind, &payload.data, payload.images).await?;
    tracing::info!(item_id = %item.id, kind = kind.label(), admin_id = %admin.id, "catalog item created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(format!("{} created", title(kind)), item)),
    ))
}

async fn update(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam(id): PathParam<String>,
    payload: WithImages<UpdateItemReq>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::update(
        &state.pool,
        &state.images,
        admin.role,
        kind,
        &id,
        &payload.data,
        payload.images,
    )
    .await?;
    Ok(Json(ApiResponse::ok(format!("{} updated", title(kind)), item)))
}

async fn remove(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    catalog_service::delete(&state.pool, &state.images, admin.role, kind, &id).await?;
    tracing::info!(item_id = %id, kind = kind.label(), admin_id = %admin.id, "catalog item deleted");
    Ok(Json(ApiResponse::message(format!("{} deleted", title(kind)))))
}

async fn add_images(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam(id): PathParam<String>,
    payload: WithImages<serde_json::Value>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::add_images(&state.pool, &state.images, admin.role, kind, &id, payload.images).await?;
    Ok(Json(ApiResponse::ok("Images added", item)))
}

async fn remove_image(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam((id, public_id)): PathParam<(String, String)>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    // cloudinary ids contain the folder, so the wildcard keeps its slashes
    let public_id = public_id.trim_start_matches('/');
    let item = catalog_service::remove_image(&state.pool, &state.images, admin.role, kind, &id, public_id).await?;
    Ok(Json(ApiResponse::ok("Image removed", item)))
}

async fn update_stock(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    PathParam(id): PathParam<String>,
    JsonBody(req): JsonBody<StockUpdateReq>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::update_stock(&state.pool, admin.role, kind, &id, req.stock).await?;
    Ok(Json(ApiResponse::ok("Stock updated", item)))
}
