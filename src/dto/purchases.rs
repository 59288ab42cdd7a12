use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Purchase, PurchaseStatus, ShippingAddress};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: String,
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: PurchaseStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub rating: i32,
    pub review: Option<String>,
}

/// Slice of the product embedded in hydrated purchase responses. `None` when
/// the listing has since been deleted; the purchase record itself survives.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub price: i64,
    pub images: Vec<String>,
    pub category: Category,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseDto {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub product: Option<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PurchaseList {
    #[schema(value_type = Vec<PurchaseDto>)]
    pub items: Vec<PurchaseDto>,
}
