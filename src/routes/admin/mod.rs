//! `/api/admin`: every route requires one of the admin roles; veg and
//! non-veg admins are further scoped per resource by the services.
use axum::Router;

use crate::app::AppState;
use crate::models::catalog::CatalogKind;

mod catalog;
mod categories;
mod contacts;
mod newsletter;
mod orders;
mod reports;
mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/categories", categories::router())
        .nest("/menu", catalog::router(CatalogKind::MenuItem))
        .nest("/products", catalog::router(CatalogKind::Product))
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .nest("/newsletter", newsletter::router())
        .nest("/contacts", contacts::router())
        .nest("/reports", reports::router())
}
