use axum::extract::State;
use axum::response::Response;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::app::AppState;
use crate::auth::AdminUser;
use crate::error::AppResult;
use crate::export::Csv;
use crate::models::common::{ApiResponse, ListQuery, Paginated};
use crate::models::newsletter::Subscriber;
use crate::routes::{PathParam, QueryParams};
use crate::services::newsletter_service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/export", get(export))
        .route("/:id", delete(remove))
}

async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    QueryParams(q): QueryParams<ListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Subscriber>>>> {
    let page = newsletter_service::list(&state.pool, &q).await?;
    Ok(Json(ApiResponse::ok("Subscribers fetched", page)))
}

async fn remove(
    _admin: AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    newsletter_service::delete(&state.pool, &id).await?;
    Ok(Json(ApiResponse::message("Subscriber deleted")))
}

async fn export(_admin: AdminUser, State(state): State<AppState>) -> AppResult<Response> {
    let subscribers = newsletter_service::export(&state.pool).await?;
    let mut csv = Csv::new(&["email", "active", "subscribed_at", "unsubscribed_at"]);
    for s in subscribers {
        csv.row([
            s.email,
            s.is_active.to_string(),
            s.subscribed_at.to_rfc3339(),
            s.unsubscribed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ]);
    }
    Ok(csv.into_download("newsletter-subscribers.csv"))
}
