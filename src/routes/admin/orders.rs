use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::export::{format_amount, Csv};
use crate::models::common::{ApiResponse, Paginated};
use crate::models::order::{Order, OrderDetail, OrderQuery, UpdateOrderStatusReq};
use crate::routes::{JsonBody, PathParam, QueryParams};
use crate::services::order_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/export", get(export))
        .route("/:id", get(show))
        .route("/:id/status", put(update_status))
}

async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<OrderQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Order>>>> {
    let page = order_service::list(&state.pool, None, &q).await?;
    Ok(Json(ApiResponse::ok("Orders fetched", page)))
}

async fn show(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = order_service::detail(&state.pool, &id).await?;
    Ok(Json(ApiResponse::ok("Order fetched", detail)))
}

async fn update_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(req): JsonBody<UpdateOrderStatusReq>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = order_service::update_status(&state.pool, &id, req.status, req.note.as_deref(), &admin.id).await?;
    Ok(Json(ApiResponse::ok("Order status updated", detail)))
}

async fn export(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<OrderQuery>,
) -> AppResult<Response> {
    let orders = order_service::export(&state.pool, &q).await?;
    let mut csv = Csv::new(&[
        "order_number",
        "created_at",
        "customer_name",
        "customer_email",
        "customer_phone",
        "status",
        "payment_method",
        "payment_status",
        "subtotal",
        "discount",
        "delivery_fee",
        "total",
        "coupon_code",
    ]);
    for order in orders {
        csv.row([
            order.order_number,
            order.created_at.to_rfc3339(),
            order.customer_name,
            order.customer_email.unwrap_or_default(),
            order.customer_phone,
            order.status.as_str().to_string(),
            order.payment_method.as_str().to_string(),
            order.payment_status.as_str().to_string(),
            format_amount(order.subtotal),
            format_amount(order.discount),
            format_amount(order.delivery_fee),
            format_amount(order.total),
            order.coupon_code.unwrap_or_default(),
        ]);
    }
    Ok(csv.into_download("orders.csv"))
}
