use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::Shopper;
use crate::error::AppResult;
use crate::models::cart::{AddToCartReq, ApplyCouponReq, CartView, UpdateQuantityReq};
use crate::models::common::ApiResponse;
use crate::routes::{JsonBody, PathParam, ValidJson};
use crate::services::cart_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show).delete(clear))
        .route("/items", post(add_item))
        .route("/items/:line_id", put(update_quantity).delete(remove_line))
        .route("/coupon", post(apply_coupon).delete(remove_coupon))
}

type CartResponse = AppResult<Json<ApiResponse<CartView>>>;

async fn show(shopper: Shopper, State(state): State<AppState>) -> CartResponse {
    let cart = cart_service::view(&state.pool, &shopper.user_id).await?;
    Ok(Json(ApiResponse::ok("Cart fetched", cart)))
}

async fn add_item(
    shopper: Shopper,
    State(state): State<AppState>,
    ValidJson(req): ValidJson<AddToCartReq>,
) -> CartResponse {
    let cart = cart_service::add_item(&state.pool, &shopper.user_id, &req).await?;
    Ok(Json(ApiResponse::ok("Item added to cart", cart)))
}

async fn update_quantity(
    shopper: Shopper,
    State(state): State<AppState>,
    PathParam(line_id): PathParam<String>,
    ValidJson(req): ValidJson<UpdateQuantityReq>,
) -> CartResponse {
    let cart = cart_service::update_quantity(&state.pool, &shopper.user_id, &line_id, req.quantity).await?;
    Ok(Json(ApiResponse::ok("Cart updated", cart)))
}

async fn remove_line(
    shopper: Shopper,
    State(state): State<AppState>,
    PathParam(line_id): PathParam<String>,
) -> CartResponse {
    let cart = cart_service::remove_line(&state.pool, &shopper.user_id, &line_id).await?;
    Ok(Json(ApiResponse::ok("Item removed from cart", cart)))
}

async fn clear(shopper: Shopper, State(state): State<AppState>) -> CartResponse {
    let cart = cart_service::clear(&state.pool, &shopper.user_id).await?;
    Ok(Json(ApiResponse::ok("Cart cleared", cart)))
}

async fn apply_coupon(
    shopper: Shopper,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ApplyCouponReq>,
) -> CartResponse {
    let cart = cart_service::apply_coupon(&state.pool, &shopper.user_id, &req.code).await?;
    Ok(Json(ApiResponse::ok("Coupon applied", cart)))
}

async fn remove_coupon(shopper: Shopper, State(state): State<AppState>) -> CartResponse {
    let cart = cart_service::remove_coupon(&state.pool, &shopper.user_id).await?;
    Ok(Json(ApiResponse::ok("Coupon removed", cart)))
}
