use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartDto, CartLineDto},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::ProductRow,
    response::ApiResponse,
};

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    item_quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

/// Raw fetch plus hydration: cart lines joined to their full product rows,
/// in insertion order. The storage layer itself stays reference-only.
async fn fetch_cart(pool: &DbPool, user_id: Uuid) -> AppResult<CartDto> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity AS item_quantity, p.*
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| CartLineDto {
            id: row.item_id,
            product: row.product.into(),
            quantity: row.item_quantity,
        })
        .collect();

    Ok(CartDto { items })
}

/// A user's cart is created lazily: no rows simply means the empty cart.
pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    let cart = fetch_cart(pool, user.user_id).await?;
    Ok(ApiResponse::success("OK", cart, None))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartDto>> {
    if payload.quantity < 1 {
        return Err(AppError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;

    let product = match product {
        Some(p) if p.is_purchasable() => p,
        _ => return Err(AppError::Validation("Product not available".to_string())),
    };

    if product.seller_id == user.user_id {
        return Err(AppError::Validation(
            "Cannot add your own product to cart".to_string(),
        ));
    }

    // Merge into an existing line for the same product instead of duplicating.
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .execute(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = fetch_cart(pool, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", cart, None))
}

/// Sets a line's quantity. Quantities below 1 never reach this function; the
/// route layer converts them into a removal.
pub async fn update_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    quantity: i32,
) -> AppResult<ApiResponse<CartDto>> {
    let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .bind(quantity)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id, "quantity": quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = fetch_cart(pool, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, None))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartDto>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = fetch_cart(pool, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", cart, None))
}

pub async fn clear_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_clear",
        Some("cart_items"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = fetch_cart(pool, user.user_id).await?;
    Ok(ApiResponse::success("Cart cleared", cart, None))
}
