use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Listing categories, stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum Category {
    Electronics,
    #[serde(rename = "Clothing & Accessories")]
    #[sqlx(rename = "Clothing & Accessories")]
    ClothingAccessories,
    #[serde(rename = "Home & Garden")]
    #[sqlx(rename = "Home & Garden")]
    HomeGarden,
    #[serde(rename = "Books & Media")]
    #[sqlx(rename = "Books & Media")]
    BooksMedia,
    #[serde(rename = "Sports & Recreation")]
    #[sqlx(rename = "Sports & Recreation")]
    SportsRecreation,
    #[serde(rename = "Toys & Games")]
    #[sqlx(rename = "Toys & Games")]
    ToysGames,
    Automotive,
    #[serde(rename = "Health & Beauty")]
    #[sqlx(rename = "Health & Beauty")]
    HealthBeauty,
    Furniture,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Electronics,
        Category::ClothingAccessories,
        Category::HomeGarden,
        Category::BooksMedia,
        Category::SportsRecreation,
        Category::ToysGames,
        Category::Automotive,
        Category::HealthBeauty,
        Category::Furniture,
        Category::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    #[sqlx(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// Purchase lifecycle label. Any status may follow any other; there is no
/// enforced transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// API-facing product listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: i64,
    pub condition: Condition,
    pub images: Vec<String>,
    pub seller_id: Uuid,
    pub is_available: bool,
    pub is_sold: bool,
    pub sold_to: Option<Uuid>,
    pub sold_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `products` row. Location lives in flat columns; the API model nests it.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: i64,
    pub condition: Condition,
    pub images: Vec<String>,
    pub seller_id: Uuid,
    pub is_available: bool,
    pub is_sold: bool,
    pub sold_to: Option<Uuid>,
    pub sold_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub tags: Vec<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Availability gate shared by cart-add and checkout. Ownership is
    /// checked separately, and only at cart-add time.
    pub fn is_purchasable(&self) -> bool {
        self.is_available && !self.is_sold
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let location = if row.location_city.is_some()
            || row.location_state.is_some()
            || row.location_country.is_some()
        {
            Some(Location {
                city: row.location_city,
                state: row.location_state,
                country: row.location_country,
            })
        } else {
            None
        };
        Product {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            price: row.price,
            condition: row.condition,
            images: row.images,
            seller_id: row.seller_id,
            is_available: row.is_available,
            is_sold: row.is_sold,
            sold_to: row.sold_to,
            sold_at: row.sold_at,
            views: row.views,
            tags: row.tags,
            location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// API-facing purchase record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub total_price: i64,
    pub payment_method: String,
    pub shipping_address: Option<ShippingAddress>,
    pub status: PurchaseStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `purchases` row with flat shipping columns.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRow {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub total_price: i64,
    pub payment_method: String,
    pub shipping_street: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip: Option<String>,
    pub shipping_country: Option<String>,
    pub status: PurchaseStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        let shipping_address = if row.shipping_street.is_some()
            || row.shipping_city.is_some()
            || row.shipping_state.is_some()
            || row.shipping_zip.is_some()
            || row.shipping_country.is_some()
        {
            Some(ShippingAddress {
                street: row.shipping_street,
                city: row.shipping_city,
                state: row.shipping_state,
                zip: row.shipping_zip,
                country: row.shipping_country,
            })
        } else {
            None
        };
        Purchase {
            id: row.id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            product_id: row.product_id,
            quantity: row.quantity,
            total_price: row.total_price,
            payment_method: row.payment_method,
            shipping_address,
            status: row.status,
            tracking_number: row.tracking_number,
            notes: row.notes,
            rating: row.rating,
            review: row.review,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(is_available: bool, is_sold: bool) -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            title: "Old bike".into(),
            description: "Rides fine".into(),
            category: Category::SportsRecreation,
            price: 12_000,
            condition: Condition::Good,
            images: vec![],
            seller_id: Uuid::new_v4(),
            is_available,
            is_sold,
            sold_to: None,
            sold_at: None,
            views: 0,
            tags: vec![],
            location_city: None,
            location_state: None,
            location_country: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn purchasable_requires_available_and_unsold() {
        assert!(row(true, false).is_purchasable());
        assert!(!row(true, true).is_purchasable());
        assert!(!row(false, false).is_purchasable());
        assert!(!row(false, true).is_purchasable());
    }

    #[test]
    fn category_serde_uses_display_names() {
        let json = serde_json::to_string(&Category::ClothingAccessories).unwrap();
        assert_eq!(json, "\"Clothing & Accessories\"");
        let parsed: Category = serde_json::from_str("\"Home & Garden\"").unwrap();
        assert_eq!(parsed, Category::HomeGarden);
        assert!(serde_json::from_str::<Category>("\"Groceries\"").is_err());
    }

    #[test]
    fn status_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Shipped).unwrap(),
            "\"shipped\""
        );
        let parsed: PurchaseStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, PurchaseStatus::Cancelled);
    }

    #[test]
    fn product_location_collapses_to_none() {
        let product: Product = row(true, false).into();
        assert!(product.location.is_none());

        let mut with_city = row(true, false);
        with_city.location_city = Some("Leipzig".into());
        let product: Product = with_city.into();
        assert_eq!(product.location.unwrap().city.as_deref(), Some("Leipzig"));
    }
}
