use marketplace_api::{
    db::DbPool,
    dto::cart::AddToCartRequest,
    dto::purchases::{CheckoutRequest, ReviewRequest, UpdateStatusRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Category, Condition, PurchaseStatus},
    routes::params::Pagination,
    services::{cart_service, purchase_service},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

// Integration tests run against a real database and are skipped when no
// database is configured. Each test works with fresh UUIDs so tests stay
// independent without truncating shared tables.
async fn setup_pool() -> Option<DbPool> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    Some(pool)
}

async fn insert_product(pool: &DbPool, seller_id: Uuid, title: &str, price: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (id, title, description, category, price, condition, seller_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(title)
    .bind("integration test listing")
    .bind(Category::Other)
    .bind(price)
    .bind(Condition::Good)
    .bind(seller_id)
    .execute(pool)
    .await
    .expect("insert product");
    id
}

async fn mark_sold(pool: &DbPool, product_id: Uuid, buyer_id: Uuid) {
    sqlx::query("UPDATE products SET is_sold = TRUE, sold_to = $2, sold_at = now() WHERE id = $1")
        .bind(product_id)
        .bind(buyer_id)
        .execute(pool)
        .await
        .expect("mark sold");
}

async fn insert_purchase(pool: &DbPool, buyer_id: Uuid, seller_id: Uuid, product_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO purchases (id, buyer_id, seller_id, product_id, quantity, total_price, payment_method)
        VALUES ($1, $2, $3, $4, 1, 1000, 'cash')
        "#,
    )
    .bind(id)
    .bind(buyer_id)
    .bind(seller_id)
    .bind(product_id)
    .execute(pool)
    .await
    .expect("insert purchase");
    id
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        payment_method: "cash".into(),
        shipping_address: None,
    }
}

#[tokio::test]
async fn add_to_cart_merges_quantities() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let product_id = insert_product(&pool, seller.user_id, "Merge target", 500).await;

    let resp = cart_service::add_to_cart(
        &pool,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 2,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    // A second add for the same product merges instead of duplicating.
    let resp = cart_service::add_to_cart(
        &pool,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 3,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.items[0].product.id, product_id);

    Ok(())
}

#[tokio::test]
async fn add_to_cart_rejects_own_and_sold_products() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let own_product = insert_product(&pool, seller.user_id, "Own listing", 500).await;
    let sold_product = insert_product(&pool, seller.user_id, "Sold listing", 500).await;
    mark_sold(&pool, sold_product, Uuid::new_v4()).await;

    let err = cart_service::add_to_cart(
        &pool,
        &seller,
        AddToCartRequest {
            product_id: own_product,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = cart_service::add_to_cart(
        &pool,
        &buyer,
        AddToCartRequest {
            product_id: sold_product,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Neither failure left anything behind in either cart.
    let cart = cart_service::get_cart(&pool, &seller).await?.data.unwrap();
    assert!(cart.items.is_empty());
    let cart = cart_service::get_cart(&pool, &buyer).await?.data.unwrap();
    assert!(cart.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn cart_update_remove_and_clear() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let first = insert_product(&pool, seller.user_id, "First", 100).await;
    let second = insert_product(&pool, seller.user_id, "Second", 200).await;

    for product_id in [first, second] {
        cart_service::add_to_cart(
            &pool,
            &buyer,
            AddToCartRequest {
                product_id,
                quantity: 1,
            },
        )
        .await?;
    }

    let cart = cart_service::get_cart(&pool, &buyer).await?.data.unwrap();
    let line = &cart.items[0];

    let cart = cart_service::update_item(&pool, &buyer, line.id, 4)
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items[0].quantity, 4);

    let err = cart_service::update_item(&pool, &buyer, Uuid::new_v4(), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let cart = cart_service::remove_item(&pool, &buyer, cart.items[0].id)
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);

    let cart = cart_service::clear_cart(&pool, &buyer).await?.data.unwrap();
    assert!(cart.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn checkout_creates_purchases_and_empties_cart() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let cheap = insert_product(&pool, seller.user_id, "Cheap item", 250).await;
    let dear = insert_product(&pool, seller.user_id, "Dear item", 10_000).await;

    cart_service::add_to_cart(
        &pool,
        &buyer,
        AddToCartRequest {
            product_id: cheap,
            quantity: 3,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &pool,
        &buyer,
        AddToCartRequest {
            product_id: dear,
            quantity: 1,
        },
    )
    .await?;

    let resp = purchase_service::checkout(&pool, &buyer, checkout_request()).await?;
    let purchases = resp.data.unwrap().items;
    assert_eq!(purchases.len(), 2);

    // One purchase per line, priced at purchase time.
    let by_product = |id: Uuid| {
        purchases
            .iter()
            .find(|p| p.purchase.product_id == id)
            .expect("purchase for product")
    };
    assert_eq!(by_product(cheap).purchase.total_price, 750);
    assert_eq!(by_product(dear).purchase.total_price, 10_000);
    assert_eq!(by_product(cheap).purchase.status, PurchaseStatus::Pending);
    assert!(by_product(cheap).product.is_some());

    for product_id in [cheap, dear] {
        let (is_sold, sold_to): (bool, Option<Uuid>) =
            sqlx::query_as("SELECT is_sold, sold_to FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_one(&pool)
                .await?;
        assert!(is_sold);
        assert_eq!(sold_to, Some(buyer.user_id));
    }

    let cart = cart_service::get_cart(&pool, &buyer).await?.data.unwrap();
    assert!(cart.items.is_empty());

    let history = purchase_service::history(
        &pool,
        &buyer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert_eq!(history.data.unwrap().items.len(), 2);

    let sales = purchase_service::sales(
        &pool,
        &seller,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert_eq!(sales.data.unwrap().items.len(), 2);

    Ok(())
}

#[tokio::test]
async fn checkout_on_empty_cart_fails() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };

    let err = purchase_service::checkout(&pool, &buyer, checkout_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg == "Cart is empty"));

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE buyer_id = $1")
        .bind(buyer.user_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(count.0, 0);

    Ok(())
}

// Documents the non-atomic checkout: a failure on the second of three lines
// leaves the first line committed and never touches the third.
#[tokio::test]
async fn checkout_stops_at_first_unavailable_line_without_rollback() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let first = insert_product(&pool, seller.user_id, "Line one", 100).await;
    let second = insert_product(&pool, seller.user_id, "Line two", 200).await;
    let third = insert_product(&pool, seller.user_id, "Line three", 300).await;

    for product_id in [first, second, third] {
        cart_service::add_to_cart(
            &pool,
            &buyer,
            AddToCartRequest {
                product_id,
                quantity: 1,
            },
        )
        .await?;
    }

    // Sold out from under the cart between add and checkout.
    mark_sold(&pool, second, Uuid::new_v4()).await;

    let err = purchase_service::checkout(&pool, &buyer, checkout_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Line two")));

    // Line one went through and is not rolled back.
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE buyer_id = $1 AND product_id = $2")
            .bind(buyer.user_id)
            .bind(first)
            .fetch_one(&pool)
            .await?;
    assert_eq!(count.0, 1);
    let (is_sold,): (bool,) = sqlx::query_as("SELECT is_sold FROM products WHERE id = $1")
        .bind(first)
        .fetch_one(&pool)
        .await?;
    assert!(is_sold);

    // Line three was never processed.
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE buyer_id = $1 AND product_id = $2")
            .bind(buyer.user_id)
            .bind(third)
            .fetch_one(&pool)
            .await?;
    assert_eq!(count.0, 0);
    let (is_sold,): (bool,) = sqlx::query_as("SELECT is_sold FROM products WHERE id = $1")
        .bind(third)
        .fetch_one(&pool)
        .await?;
    assert!(!is_sold);

    // The cart is not cleared on failure.
    let cart = cart_service::get_cart(&pool, &buyer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 3);

    Ok(())
}

#[tokio::test]
async fn review_enforces_rating_range_and_buyer_ownership() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let product_id = insert_product(&pool, seller.user_id, "Reviewed item", 900).await;
    let purchase_id = insert_purchase(&pool, buyer.user_id, seller.user_id, product_id).await;

    for rating in [0, 6] {
        let err = purchase_service::add_review(
            &pool,
            &buyer,
            purchase_id,
            ReviewRequest {
                rating,
                review: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let resp = purchase_service::add_review(
        &pool,
        &buyer,
        purchase_id,
        ReviewRequest {
            rating: 1,
            review: Some("meh".into()),
        },
    )
    .await?;
    assert_eq!(resp.data.unwrap().purchase.rating, Some(1));

    // A later review overwrites the earlier one.
    let resp = purchase_service::add_review(
        &pool,
        &buyer,
        purchase_id,
        ReviewRequest {
            rating: 5,
            review: Some("actually great".into()),
        },
    )
    .await?;
    let purchase = resp.data.unwrap().purchase;
    assert_eq!(purchase.rating, Some(5));
    assert_eq!(purchase.review.as_deref(), Some("actually great"));

    // Only the buyer may review.
    let err = purchase_service::add_review(
        &pool,
        &seller,
        purchase_id,
        ReviewRequest {
            rating: 3,
            review: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    Ok(())
}

#[tokio::test]
async fn status_update_is_seller_only_and_order_free() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await else {
        return Ok(());
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let seller = AuthUser {
        user_id: Uuid::new_v4(),
    };
    let product_id = insert_product(&pool, seller.user_id, "Shipped item", 900).await;
    let purchase_id = insert_purchase(&pool, buyer.user_id, seller.user_id, product_id).await;

    let err = purchase_service::update_status(
        &pool,
        &buyer,
        purchase_id,
        UpdateStatusRequest {
            status: PurchaseStatus::Shipped,
            tracking_number: None,
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let (status,): (PurchaseStatus,) =
        sqlx::query_as("SELECT status FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(status, PurchaseStatus::Pending);

    let resp = purchase_service::update_status(
        &pool,
        &seller,
        purchase_id,
        UpdateStatusRequest {
            status: PurchaseStatus::Delivered,
            tracking_number: Some("TRACK-1".into()),
            notes: None,
        },
    )
    .await?;
    let purchase = resp.data.unwrap().purchase;
    assert_eq!(purchase.status, PurchaseStatus::Delivered);
    assert_eq!(purchase.tracking_number.as_deref(), Some("TRACK-1"));

    // No transition-order enforcement: delivered may go back to confirmed,
    // and omitted tracking is preserved.
    let resp = purchase_service::update_status(
        &pool,
        &seller,
        purchase_id,
        UpdateStatusRequest {
            status: PurchaseStatus::Confirmed,
            tracking_number: None,
            notes: Some("buyer asked to hold shipment".into()),
        },
    )
    .await?;
    let purchase = resp.data.unwrap().purchase;
    assert_eq!(purchase.status, PurchaseStatus::Confirmed);
    assert_eq!(purchase.tracking_number.as_deref(), Some("TRACK-1"));
    assert_eq!(
        purchase.notes.as_deref(),
        Some("buyer asked to hold shipment")
    );

    Ok(())
}
