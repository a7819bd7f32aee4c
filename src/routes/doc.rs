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
        auth::{AuthPayload, CurrentUser, LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, CartCount, CartItemDto, CartList, UpdateCartItemRequest},
        likes::{LikeStatus, LikedMenuList},
        menus::{
            CategoryList, CreateMenuRequest, MenuList, MenuListing, MenuQuery, UpdateMenuRequest,
        },
        order_items::{
            CreateOrderItemRequest, OrderItemList, OrderItemQuery, UpdateOrderItemRequest,
        },
        orders::{
            CreateOrderRequest, OrderLine, OrderList, OrderListQuery, OrderWithItems,
            UpdateOrderRequest,
        },
        payments::{
            CreatePaymentRequest, InitiatePaymentRequest, InitiatePaymentResponse,
            PaymentCallbackQuery, PaymentCompleted, PaymentList, PaymentQuery,
            UpdatePaymentRequest,
        },
        restaurants::{
            CreateRestaurantRequest, RestaurantList, RestaurantQuery, RestaurantWithMenus,
            UpdateRestaurantRequest,
        },
    },
    error::ErrorData,
    models::{
        Menu, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentState,
        PaymentStatus, Restaurant, RestaurantSummary, Role, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, health, menus, order_items, orders, params, payments, restaurants, users,
    },
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
        users::me,
        users::my_likes,
        restaurants::list_restaurants,
        restaurants::my_restaurants,
        restaurants::get_restaurant,
        restaurants::create_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        menus::list_menus,
        menus::list_categories,
        menus::get_menu,
        menus::create_menu,
        menus::update_menu,
        menus::delete_menu,
        menus::like_menu,
        menus::unlike_menu,
        menus::like_status,
        cart::cart_list,
        cart::add_to_cart,
        cart::cart_count,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::list_orders,
        orders::create_order,
        orders::checkout,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        order_items::list_order_items,
        order_items::get_order_item,
        order_items::create_order_item,
        order_items::update_order_item,
        order_items::delete_order_item,
        payments::initiate_payment,
        payments::payment_success,
        payments::payment_cancel,
        payments::list_payments,
        payments::get_payment,
        payments::create_payment,
        payments::update_payment,
        payments::delete_payment
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            PaymentState,
            PaymentMethod,
            User,
            Restaurant,
            RestaurantSummary,
            Menu,
            Order,
            OrderItem,
            Payment,
            RegisterRequest,
            LoginRequest,
            AuthPayload,
            CurrentUser,
            CreateRestaurantRequest,
            UpdateRestaurantRequest,
            RestaurantQuery,
            RestaurantList,
            RestaurantWithMenus,
            CreateMenuRequest,
            UpdateMenuRequest,
            MenuQuery,
            MenuListing,
            MenuList,
            CategoryList,
            LikeStatus,
            LikedMenuList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CartCount,
            OrderLine,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderListQuery,
            OrderWithItems,
            OrderList,
            CreateOrderItemRequest,
            UpdateOrderItemRequest,
            OrderItemQuery,
            OrderItemList,
            InitiatePaymentRequest,
            InitiatePaymentResponse,
            PaymentCallbackQuery,
            CreatePaymentRequest,
            UpdatePaymentRequest,
            PaymentQuery,
            PaymentList,
            PaymentCompleted,
            params::Pagination,
            params::SortOrder,
            params::MenuSortBy,
            ErrorData,
            Meta,
            ApiResponse<MenuList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<CartList>,
            ApiResponse<Payment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and current user"),
        (name = "Restaurants", description = "Restaurant endpoints"),
        (name = "Menus", description = "Menu item endpoints"),
        (name = "Likes", description = "Menu item likes"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Order Items", description = "Order item administration"),
        (name = "Payments", description = "PayPal checkout and payment administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_payment_callbacks() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payments/success"));
        assert!(doc.paths.paths.contains_key("/api/menus/{id}/like"));
    }
}
