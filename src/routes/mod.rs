use axum::Router;

use crate::db::DbPool;

pub mod cart;
pub mod doc;
pub mod health;
pub mod params;
pub mod products;
pub mod purchases;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<DbPool> {
    Router::new()
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/purchases", purchases::router())
}
