use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod doc;
pub mod health;
pub mod menus;
pub mod order_items;
pub mod orders;
pub mod params;
pub mod payments;
pub mod restaurants;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/user", users::router())
        .nest("/restaurants", restaurants::router())
        .nest("/menus", menus::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/order-items", order_items::router())
        .nest("/payments", payments::router())
}
