use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::purchases::{
        CheckoutRequest, PurchaseDto, PurchaseList, ReviewRequest, UpdateStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::purchase_service,
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/history", get(history))
        .route("/sales", get(sales))
        .route("/{id}/status", put(update_status))
        .route("/{id}/review", post(add_review))
}

#[utoipa::path(
    post,
    path = "/api/purchases/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "One purchase per cart line; cart emptied", body = ApiResponse<PurchaseList>),
        (status = 400, description = "Empty cart or a line no longer available"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn checkout(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PurchaseList>>)> {
    let resp = purchase_service::checkout(&pool, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/purchases/history",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Caller's purchases, newest first", body = ApiResponse<PurchaseList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn history(
    State(pool): State<DbPool>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let resp = purchase_service::history(&pool, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/purchases/sales",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Caller's sales, newest first", body = ApiResponse<PurchaseList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn sales(
    State(pool): State<DbPool>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let resp = purchase_service::sales(&pool, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/purchases/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Logistics fields updated", body = ApiResponse<PurchaseDto>),
        (status = 401, description = "Caller is not the seller"),
        (status = 404, description = "Purchase not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn update_status(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<PurchaseDto>>> {
    let resp = purchase_service::update_status(&pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/purchases/{id}/review",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review attached; repeat calls overwrite", body = ApiResponse<PurchaseDto>),
        (status = 400, description = "Rating outside 1-5"),
        (status = 401, description = "Caller is not the buyer"),
        (status = 404, description = "Purchase not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn add_review(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<PurchaseDto>>> {
    let resp = purchase_service::add_review(&pool, &user, id, payload).await?;
    Ok(Json(resp))
}
