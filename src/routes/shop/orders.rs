use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::{AuthUser, Shopper};
use crate::error::{AppError, AppResult};
use crate::models::common::{ApiResponse, Paginated};
use crate::models::order::{CheckoutReq, Order, OrderDetail, OrderQuery};
use crate::rbac::Role;
use crate::routes::{PathParam, QueryParams, ValidJson};
use crate::services::order_service::{self, CheckoutInput};
use crate::validation::clean_opt;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(checkout))
        .route("/:id", get(show))
        .route("/:id/cancel", post(cancel))
}

async fn checkout(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CheckoutReq>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderDetail>>)> {
    if auth.role != Role::Customer {
        return Err(AppError::Forbidden("Only customers can place orders".into()));
    }
    let phone = req
        .phone
        .as_deref()
        .or(auth.user.phone.as_deref())
        .and_then(|p| clean_opt(Some(p)))
        .ok_or_else(|| AppError::BadRequest("A phone number is required to place an order".into()))?;

    let detail = order_service::checkout(
        &state.pool,
        &state.config,
        &state.mailer,
        CheckoutInput {
            owner_id: auth.id,
            is_guest: false,
            customer_name: auth.user.name,
            customer_email: auth.user.email,
            customer_phone: phone,
            delivery_address: req.delivery_address,
            payment_method: req.payment_method,
            notes: clean_opt(req.notes.as_deref()),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Order placed", detail))))
}

async fn list(
    shopper: Shopper,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<OrderQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Order>>>> {
    let page = order_service::list(&state.pool, Some(&shopper.user_id), &q).await?;
    Ok(Json(ApiResponse::ok("Orders fetched", page)))
}

async fn show(
    shopper: Shopper,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = order_service::detail_for_user(&state.pool, &shopper.user_id, &id).await?;
    Ok(Json(ApiResponse::ok("Order fetched", detail)))
}

async fn cancel(
    shopper: Shopper,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = order_service::cancel_by_customer(&state.pool, &shopper.user_id, &id).await?;
    tracing::info!(order_id = %id, user_id = %shopper.user_id, "order cancelled by customer");
    Ok(Json(ApiResponse::ok("Order cancelled", detail)))
}
