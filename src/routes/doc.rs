use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartDto, CartLineDto, UpdateCartItemRequest},
        products::{CategoryList, CreateProductRequest, ProductList, UpdateProductRequest},
        purchases::{
            CheckoutRequest, ProductSummary, PurchaseDto, PurchaseList, ReviewRequest,
            UpdateStatusRequest,
        },
    },
    models::{Category, Condition, Location, Product, Purchase, PurchaseStatus, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{cart, health, params, products, purchases},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        products::list_products,
        products::categories,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::my_listings,
        purchases::checkout,
        purchases::history,
        purchases::sales,
        purchases::update_status,
        purchases::add_review
    ),
    components(
        schemas(
            Product,
            Purchase,
            Category,
            Condition,
            PurchaseStatus,
            Location,
            ShippingAddress,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLineDto,
            CartDto,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CategoryList,
            CheckoutRequest,
            UpdateStatusRequest,
            ReviewRequest,
            ProductSummary,
            PurchaseDto,
            PurchaseList,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartDto>,
            ApiResponse<PurchaseDto>,
            ApiResponse<PurchaseList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Listing endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Purchases", description = "Checkout and purchase endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
