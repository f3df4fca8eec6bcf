use utoipa::OpenApi;

use crate::handlers::{inventory, orders, webhooks};

#[derive(OpenApi)]
#[openapi(
    paths(
        webhooks::payment_webhook,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::resend_confirmation,
        inventory::get_stock,
        inventory::set_stock,
    ),
    components(schemas(
        webhooks::WebhookResponse,
        orders::CustomerDto,
        orders::ShippingAddressDto,
        orders::CartItemRequest,
        orders::CreateOrderRequest,
        orders::OrderItemResponse,
        orders::NotificationResponse,
        orders::OrderResponse,
        orders::ListOrdersResponse,
        orders::ConfirmationResponse,
        inventory::StockResponse,
        inventory::SetStockRequest,
    )),
    tags(
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "orders", description = "Checkout and order lookup"),
        (name = "inventory", description = "Stock per product and size"),
    )
)]
pub struct ApiDoc;
