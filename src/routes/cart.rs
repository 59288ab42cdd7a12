use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartDto, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/update/{item_id}", put(update_item))
        .route("/remove/{item_id}", delete(remove_item))
        .route("/clear", delete(clear_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Caller's cart with products resolved", body = ApiResponse<CartDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::get_cart(&pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line added or merged", body = ApiResponse<CartDto>),
        (status = 400, description = "Product not available or own listing"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::add_to_cart(&pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/update/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity set; below 1 removes the line", body = ApiResponse<CartDto>),
        (status = 404, description = "Line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    // A requested quantity below 1 means the line goes away.
    let resp = if payload.quantity < 1 {
        cart_service::remove_item(&pool, &user, item_id).await?
    } else {
        cart_service::update_item(&pool, &user, item_id, payload.quantity).await?
    };
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/remove/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line ID")),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartDto>),
        (status = 404, description = "Line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::remove_item(&pool, &user, item_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/clear",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::clear_cart(&pool, &user).await?;
    Ok(Json(resp))
}
