use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Condition, Location, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: i64,
    pub condition: Condition,
    pub images: Option<Vec<String>>,
    pub location: Option<Location>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<i64>,
    pub condition: Option<Condition>,
    pub images: Option<Vec<String>>,
    pub location: Option<Location>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
