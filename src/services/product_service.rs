use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductRow},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
};

const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x300?text=Product+Image";

fn push_filters(qb: &mut QueryBuilder<Postgres>, query: &ProductQuery) {
    // Browsing only ever shows live listings.
    qb.push(" WHERE is_available = TRUE AND is_sold = FALSE");

    if let Some(category) = query
        .category
        .as_ref()
        .filter(|c| !c.is_empty() && *c != "all")
    {
        qb.push(" AND category = ").push_bind(category.clone());
    }

    if let Some(min_price) = query.min_price {
        qb.push(" AND price >= ").push_bind(min_price);
    }

    if let Some(max_price) = query.max_price {
        qb.push(" AND price <= ").push_bind(max_price);
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR array_to_string(tags, ' ') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_products(
    pool: &DbPool,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count_qb, &query);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut qb = QueryBuilder::new("SELECT * FROM products");
    push_filters(&mut qb, &query);
    qb.push(format!(
        " ORDER BY {} {}",
        sort_by.as_sql(),
        sort_order.as_sql()
    ));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let items: Vec<Product> = qb
        .build_query_as::<ProductRow>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

/// Single listing lookup. Every read bumps the view counter.
pub async fn get_product(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET views = views + 1 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let product = match row {
        Some(p) => Product::from(p),
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if payload.description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    if payload.price < 0 {
        return Err(AppError::Validation(
            "Price must not be negative".to_string(),
        ));
    }

    let images = match payload.images {
        Some(images) if !images.is_empty() => images,
        _ => vec![PLACEHOLDER_IMAGE.to_string()],
    };
    let tags = payload.tags.unwrap_or_default();
    let location = payload.location;

    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        INSERT INTO products (
            id, title, description, category, price, condition, images,
            seller_id, tags, location_city, location_state, location_country
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.title.trim())
    .bind(payload.description.trim())
    .bind(payload.category)
    .bind(payload.price)
    .bind(payload.condition)
    .bind(&images)
    .bind(user.user_id)
    .bind(&tags)
    .bind(location.as_ref().and_then(|l| l.city.clone()))
    .bind(location.as_ref().and_then(|l| l.state.clone()))
    .bind(location.as_ref().and_then(|l| l.country.clone()))
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": row.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        Product::from(row),
        Some(Meta::empty()),
    ))
}

/// Owner-only partial update of the listing fields. Availability and sold
/// state are not editable here; the sold transition belongs to checkout.
pub async fn update_product(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if existing.seller_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    if let Some(price) = payload.price
        && price < 0
    {
        return Err(AppError::Validation(
            "Price must not be negative".to_string(),
        ));
    }

    let title = payload.title.unwrap_or(existing.title);
    let description = payload.description.unwrap_or(existing.description);
    let category = payload.category.unwrap_or(existing.category);
    let price = payload.price.unwrap_or(existing.price);
    let condition = payload.condition.unwrap_or(existing.condition);
    let images = payload.images.unwrap_or(existing.images);
    let tags = payload.tags.unwrap_or(existing.tags);
    let (city, state, country) = match payload.location {
        Some(location) => (location.city, location.state, location.country),
        None => (
            existing.location_city,
            existing.location_state,
            existing.location_country,
        ),
    };

    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        UPDATE products
        SET title = $2, description = $3, category = $4, price = $5,
            condition = $6, images = $7, tags = $8,
            location_city = $9, location_state = $10, location_country = $11,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(category)
    .bind(price)
    .bind(condition)
    .bind(&images)
    .bind(&tags)
    .bind(city)
    .bind(state)
    .bind(country)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        Product::from(row),
        Some(Meta::empty()),
    ))
}

/// Owner-only hard delete. Cart lines referencing the product cascade away;
/// purchase records keep their reference.
pub async fn delete_product(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT seller_id FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let (seller_id,) = owner.ok_or(AppError::NotFound)?;
    if seller_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// All of the caller's listings, sold ones included, newest first.
pub async fn my_listings(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE seller_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE seller_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    let items = rows.into_iter().map(Product::from).collect();
    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Listings",
        ProductList { items },
        Some(meta),
    ))
}
