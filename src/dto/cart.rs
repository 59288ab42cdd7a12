use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// A cart line with its product reference resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}

/// The caller's cart, hydrated. An absent cart is the empty cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartDto {
    pub items: Vec<CartLineDto>,
}
