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
        cart::{AddToCartRequest, CartLineDto, CartView, SetQuantityRequest},
        orders::{
            AdvanceOrderRequest, CheckoutRequest, OrderList, OrderSummary, OrderWithItems,
            RecordPaymentRequest, StatusCount,
        },
    },
    feed::{ChangeEvent, ChangeKind, Table},
    models::{CartItem, FoodItem, Order, OrderItem, PaymentMethod, PaymentStatus, Role},
    order_status::OrderStatus,
    pricing::CartTotals,
    response::{ApiResponse, Meta},
    routes::{canteen, cart, health::{self, HealthData}, orders, params},
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
        cart::cart_list,
        cart::add_to_cart,
        cart::set_quantity,
        cart::remove_from_cart,
        cart::cart_events,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::order_events,
        orders::single_order_events,
        canteen::list_all_orders,
        canteen::order_summary,
        canteen::get_order,
        canteen::advance_order,
        canteen::record_payment,
        canteen::board_events
    ),
    components(
        schemas(
            FoodItem,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            Role,
            CartTotals,
            CartLineDto,
            CartView,
            AddToCartRequest,
            SetQuantityRequest,
            CheckoutRequest,
            AdvanceOrderRequest,
            RecordPaymentRequest,
            OrderList,
            OrderWithItems,
            OrderSummary,
            StatusCount,
            ChangeEvent,
            ChangeKind,
            Table,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            HealthData,
            ApiResponse<HealthData>,
            ApiResponse<CartView>,
            ApiResponse<CartItem>,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<OrderSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart of the signed-in user"),
        (name = "Orders", description = "Checkout and order tracking"),
        (name = "Canteen", description = "Fulfillment board for canteen staff"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
