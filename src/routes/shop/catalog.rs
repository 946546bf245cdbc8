use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::AppResult;
use crate::models::catalog::{CatalogItem, CatalogKind, CatalogQuery};
use crate::models::category::Category;
use crate::models::common::{ApiResponse, Paginated};
use crate::routes::{PathParam, QueryParams};
use crate::services::{catalog_service, category_service};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/menu", get(menu))
        .route("/menu/:id", get(menu_item))
        .route("/products", get(products))
        .route("/products/:id", get(product))
}

#[derive(Debug, Default, Deserialize)]
struct CategoryFilter {
    vegetarian: Option<bool>,
}

async fn categories(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<CategoryFilter>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = category_service::list_active(&state.pool, filter.vegetarian).await?;
    Ok(Json(ApiResponse::ok("Categories fetched", categories)))
}

async fn menu(
    State(state): State<AppState>,
    QueryParams(q): QueryParams<CatalogQuery>,
) -> AppResult<Json<ApiResponse<Paginated<CatalogItem>>>> {
    let page = catalog_service::shop_list(&state.pool, CatalogKind::MenuItem, &q).await?;
    Ok(Json(ApiResponse::ok("Menu fetched", page)))
}

async fn menu_item(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::shop_get(&state.pool, CatalogKind::MenuItem, &id).await?;
    Ok(Json(ApiResponse::ok("Menu item fetched", item)))
}

async fn products(
    State(state): State<AppState>,
    QueryParams(q): QueryParams<CatalogQuery>,
) -> AppResult<Json<ApiResponse<Paginated<CatalogItem>>>> {
    let page = catalog_service::shop_list(&state.pool, CatalogKind::Product, &q).await?;
    Ok(Json(ApiResponse::ok("Products fetched", page)))
}

async fn product(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let item = catalog_service::shop_get(&state.pool, CatalogKind::Product, &id).await?;
    Ok(Json(ApiResponse::ok("Product fetched", item)))
}
