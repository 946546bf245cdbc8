use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::models::common::ApiResponse;
use crate::models::report::{DailySales, SalesQuery, Summary, TopItem, TopItemsQuery};
use crate::routes::QueryParams;
use crate::services::report_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/sales", get(sales))
        .route("/top-items", get(top_items))
}

async fn summary(_admin: AdminUser, State(state): State<AppState>) -> AppResult<Json<ApiResponse<Summary>>> {
    let summary = report_service::summary(&state.pool).await?;
    Ok(Json(ApiResponse::ok("Dashboard summary", summary)))
}

async fn sales(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<SalesQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailySales>>>> {
    let days = report_service::sales(&state.pool, q.days).await?;
    Ok(Json(ApiResponse::ok("Sales report", days)))
}

async fn top_items(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<TopItemsQuery>,
) -> AppResult<Json<ApiResponse<Vec<TopItem>>>> {
    let items = report_service::top_items(&state.pool, q.limit).await?;
    Ok(Json(ApiResponse::ok("Top selling items", items)))
}
