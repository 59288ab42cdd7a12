use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::purchases::{
        CheckoutRequest, ProductSummary, PurchaseDto, PurchaseList, ReviewRequest,
        UpdateStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Category, ProductRow, PurchaseRow, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

#[derive(FromRow)]
struct PurchaseWithProductRow {
    #[sqlx(flatten)]
    purchase: PurchaseRow,
    product_title: Option<String>,
    product_price: Option<i64>,
    product_images: Option<Vec<String>>,
    product_category: Option<Category>,
}

impl From<PurchaseWithProductRow> for PurchaseDto {
    fn from(row: PurchaseWithProductRow) -> Self {
        let product = row.product_title.map(|title| ProductSummary {
            id: row.purchase.product_id,
            title,
            price: row.product_price.unwrap_or_default(),
            images: row.product_images.unwrap_or_default(),
            category: row.product_category.unwrap_or(Category::Other),
        });
        PurchaseDto {
            purchase: row.purchase.into(),
            product,
        }
    }
}

const HYDRATED_SELECT: &str = r#"
    SELECT pu.*,
           pr.title AS product_title, pr.price AS product_price,
           pr.images AS product_images, pr.category AS product_category
    FROM purchases pu
    LEFT JOIN products pr ON pr.id = pu.product_id
"#;

async fn fetch_hydrated(pool: &DbPool, ids: &[Uuid]) -> AppResult<Vec<PurchaseDto>> {
    let rows = sqlx::query_as::<_, PurchaseWithProductRow>(&format!(
        "{HYDRATED_SELECT} WHERE pu.id = ANY($1) ORDER BY pu.created_at ASC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PurchaseDto::from).collect())
}

/// Converts every cart line into a purchase record and marks the products
/// sold, then empties the cart.
///
/// Lines are processed strictly in insertion order with no surrounding
/// transaction: a failure on line N leaves lines 1..N committed (purchases
/// written, sold flags set) and the cart intact. The caller sees which
/// product failed and nothing is retried or compensated.
pub async fn checkout(
    pool: &DbPool,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<PurchaseList>> {
    #[derive(FromRow)]
    struct LineRow {
        product_id: Uuid,
        quantity: i32,
        title: String,
    }

    let lines = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT ci.product_id, ci.quantity, p.title
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    if lines.is_empty() {
        return Err(AppError::Validation("Cart is empty".to_string()));
    }

    let shipping = payload.shipping_address.unwrap_or(ShippingAddress {
        street: None,
        city: None,
        state: None,
        zip: None,
        country: None,
    });

    let mut created: Vec<Uuid> = Vec::with_capacity(lines.len());

    for line in &lines {
        // Re-fetch so the availability check sees the current state, not the
        // snapshot taken at cart-add time.
        let product = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(line.product_id)
            .fetch_optional(pool)
            .await?;

        let product = match product {
            Some(p) if p.is_purchasable() => p,
            _ => {
                return Err(AppError::Validation(format!(
                    "Product \"{}\" is no longer available",
                    line.title
                )));
            }
        };

        // Total price is fixed at purchase time and never recomputed.
        let total_price = product.price * i64::from(line.quantity);

        let purchase_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, buyer_id, seller_id, product_id, quantity, total_price,
                payment_method, shipping_street, shipping_city, shipping_state,
                shipping_zip, shipping_country
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(purchase_id)
        .bind(user.user_id)
        .bind(product.seller_id)
        .bind(product.id)
        .bind(line.quantity)
        .bind(total_price)
        .bind(&payload.payment_method)
        .bind(&shipping.street)
        .bind(&shipping.city)
        .bind(&shipping.state)
        .bind(&shipping.zip)
        .bind(&shipping.country)
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE products
            SET is_sold = TRUE, sold_to = $2, sold_at = $3, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(user.user_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        created.push(purchase_id);
    }

    // Final step: empty the cart in a single statement.
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "checkout",
        Some("purchases"),
        Some(serde_json::json!({ "purchase_ids": &created })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let items = fetch_hydrated(pool, &created).await?;
    Ok(ApiResponse::success(
        "Checkout complete",
        PurchaseList { items },
        Some(Meta::empty()),
    ))
}

async fn list_for(
    pool: &DbPool,
    side: &str,
    user_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    let (page, limit, offset) = pagination.normalize();

    let rows = sqlx::query_as::<_, PurchaseWithProductRow>(&format!(
        "{HYDRATED_SELECT} WHERE pu.{side} = $1 ORDER BY pu.created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as(&format!("SELECT COUNT(*) FROM purchases WHERE {side} = $1"))
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    let items = rows.into_iter().map(PurchaseDto::from).collect();
    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", PurchaseList { items }, Some(meta)))
}

/// Purchases where the caller is the buyer, newest first.
pub async fn history(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    list_for(pool, "buyer_id", user.user_id, pagination).await
}

/// Purchases where the caller is the seller, newest first.
pub async fn sales(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    list_for(pool, "seller_id", user.user_id, pagination).await
}

/// Seller-only logistics update. The status is a free-form label: any value
/// may follow any other. Tracking number and notes are only overwritten when
/// provided.
pub async fn update_status(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<PurchaseDto>> {
    let purchase = sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if purchase.seller_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    sqlx::query(
        r#"
        UPDATE purchases
        SET status = $2,
            tracking_number = COALESCE($3, tracking_number),
            notes = COALESCE($4, notes),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(&payload.tracking_number)
    .bind(&payload.notes)
    .execute(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "purchase_status",
        Some("purchases"),
        Some(serde_json::json!({ "purchase_id": id, "status": payload.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let mut items = fetch_hydrated(pool, &[id]).await?;
    let dto = items.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Status updated", dto, None))
}

/// Buyer-only review. Repeat calls overwrite the previous rating and text.
pub async fn add_review(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: ReviewRequest,
) -> AppResult<ApiResponse<PurchaseDto>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let purchase = sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if purchase.buyer_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("UPDATE purchases SET rating = $2, review = $3, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(payload.rating)
        .bind(&payload.review)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "purchase_review",
        Some("purchases"),
        Some(serde_json::json!({ "purchase_id": id, "rating": payload.rating })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let mut items = fetch_hydrated(pool, &[id]).await?;
    let dto = items.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Review saved", dto, None))
}
