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
        auth::{LoginRequest, LoginResponse, MeResponse, RegisterRequest},
        cart::{AddToCartRequest, CartLineView, CartView, UpdateCartRequest},
        checkout::{CheckoutRequest, CheckoutSummary},
        competition::{AttemptStatus, CompetitionOverview, SubmitCodeRequest, SubmitCodeResponse},
        designs::{AddDesignToCartRequest, SubmitDesignRequest},
        orders::{OrderFailure, OrderList, OrderWithItems},
        products::{Catalog, CategoryGroup, SyncReport},
    },
    models::{CustomDesign, Order, OrderItem, Product, ProductOption, ProductOptionValue, ProductVariant, User, UserProfile},
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, checkout, competition, designs, health, orders, params, payments,
        products as product_routes,
    },
    session::cart::CartLine,
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
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::sync_products,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_cart_line,
        cart::remove_from_cart,
        checkout::checkout_page,
        checkout::checkout_submit,
        payments::paystack_callback,
        orders::list_orders,
        orders::order_success,
        orders::order_failure,
        competition::competition_page,
        competition::submit_code,
        designs::submit_design,
        designs::add_design_to_cart
    ),
    components(
        schemas(
            User,
            UserProfile,
            Product,
            ProductOption,
            ProductOptionValue,
            ProductVariant,
            CustomDesign,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            MeResponse,
            AddToCartRequest,
            UpdateCartRequest,
            CartLine,
            CartLineView,
            CartView,
            CheckoutRequest,
            CheckoutSummary,
            OrderList,
            OrderWithItems,
            OrderFailure,
            Catalog,
            CategoryGroup,
            SyncReport,
            SubmitCodeRequest,
            SubmitCodeResponse,
            AttemptStatus,
            CompetitionOverview,
            SubmitDesignRequest,
            AddDesignToCartRequest,
            params::SortOrder,
            Meta,
            ApiResponse<Product>,
            ApiResponse<Catalog>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and session identity"),
        (name = "Products", description = "Printify-backed catalog"),
        (name = "Cart", description = "Session cart"),
        (name = "Checkout", description = "Paystack checkout"),
        (name = "Payments", description = "Paystack callback"),
        (name = "Orders", description = "Order pages"),
        (name = "Competition", description = "Winning codes and referrals"),
        (name = "Designs", description = "Custom designs"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
