//! `/api/shop`: the public storefront. Catalog reads are anonymous; carts
//! and orders belong to a signed-in customer or a guest session.
use axum::Router;

use crate::app::AppState;

mod cart;
mod catalog;
mod contact;
mod guest;
mod newsletter;
mod orders;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/guest", guest::router())
        .nest("/newsletter", newsletter::router())
        .nest("/contact", contact::router())
}
