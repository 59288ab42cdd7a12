use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use marketplace_api::{
    config::AppConfig,
    db::create_pool,
    middleware::auth::Claims,
    models::{Category, Condition},
};

// Seeds a few demo listings and prints bearer tokens for a demo seller and
// buyer. Token issuance is an external concern in production; these tokens
// exist purely for local poking at the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let seller_id = Uuid::new_v4();
    let buyer_id = Uuid::new_v4();

    let listings = [
        (
            "Commuter bike",
            "Three years old, recently serviced",
            Category::SportsRecreation,
            Condition::Good,
            95_00_i64,
        ),
        (
            "Paperback box set",
            "Complete series, light shelf wear",
            Category::BooksMedia,
            Condition::LikeNew,
            30_00,
        ),
        (
            "Desk lamp",
            "Works fine, small scratch on the base",
            Category::Furniture,
            Condition::Fair,
            12_00,
        ),
    ];

    for (title, description, category, condition, price) in listings {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, description, category, price, condition, seller_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(price)
        .bind(condition)
        .bind(seller_id)
        .execute(&pool)
        .await?;
    }
    println!("Seeded {} listings for seller {seller_id}", listings.len());

    let secret = std::env::var("JWT_SECRET")?;
    println!("Seller token: {}", demo_token(seller_id, &secret)?);
    println!("Buyer token:  {}", demo_token(buyer_id, &secret)?);

    Ok(())
}

fn demo_token(user_id: Uuid, secret: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 60 * 60 * 24 * 30) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
