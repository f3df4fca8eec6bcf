use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::fulfillment::ResendOutcome;
use crate::application::order_service::CheckoutInput;
use crate::domain::notification::NotificationResult;
use crate::domain::order::{CartItem, Customer, Order, OrderStatus, ShippingAddress};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerDto {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ShippingAddressDto {
    Home {
        recipient: String,
        street: String,
        city: String,
        province: String,
        postal_code: String,
    },
    Branch {
        branch_id: String,
        branch_name: String,
        city: String,
    },
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer: CustomerDto,
    pub items: Vec<CartItemRequest>,
    pub shipping_address: ShippingAddressDto,
    pub discount_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub status: String,
    pub message_id: Option<String>,
    pub attempts: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub status: String,
    pub subtotal: String,
    pub total_amount: String,
    pub items: Vec<OrderItemResponse>,
    pub customer: CustomerDto,
    pub shipping_address: ShippingAddressDto,
    pub discount_code: Option<String>,
    pub payment_provider_id: Option<String>,
    pub tracking_code: Option<String>,
    pub notes: String,
    pub notification: NotificationResponse,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationResponse {
    /// `sent`, `failed` or `skipped`
    pub outcome: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(dto: ShippingAddressDto) -> Self {
        match dto {
            ShippingAddressDto::Home {
                recipient,
                street,
                city,
                province,
                postal_code,
            } => ShippingAddress::Home {
                recipient,
                street,
                city,
                province,
                postal_code,
            },
            ShippingAddressDto::Branch {
                branch_id,
                branch_name,
                city,
            } => ShippingAddress::Branch {
                branch_id,
                branch_name,
                city,
            },
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(address: ShippingAddress) -> Self {
        match address {
            ShippingAddress::Home {
                recipient,
                street,
                city,
                province,
                postal_code,
            } => ShippingAddressDto::Home {
                recipient,
                street,
                city,
                province,
                postal_code,
            },
            ShippingAddress::Branch {
                branch_id,
                branch_name,
                city,
            } => ShippingAddressDto::Branch {
                branch_id,
                branch_name,
                city,
            },
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let subtotal = order.subtotal().with_scale(2).to_string();
        OrderResponse {
            id: order.id,
            status: order.status.to_string(),
            subtotal,
            total_amount: order.total_amount.with_scale(2).to_string(),
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    size: i.size,
                    quantity: i.quantity,
                    unit_price: i.unit_price.with_scale(2).to_string(),
                })
                .collect(),
            customer: CustomerDto {
                name: order.customer.name,
                email: order.customer.email,
                phone: order.customer.phone,
            },
            shipping_address: order.shipping_address.into(),
            discount_code: order.discount_code,
            payment_provider_id: order.payment_provider_id,
            tracking_code: order.tracking_code,
            notes: order.notes,
            notification: NotificationResponse {
                status: order.notification.status.as_str().to_string(),
                message_id: order.notification.message_id,
                attempts: order.notification.attempts,
            },
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

impl From<ResendOutcome> for ConfirmationResponse {
    fn from(outcome: ResendOutcome) -> Self {
        match outcome {
            ResendOutcome::Attempted(NotificationResult::Sent { message_id }) => {
                ConfirmationResponse {
                    outcome: "sent".to_string(),
                    message_id: Some(message_id),
                    error: None,
                }
            }
            ResendOutcome::Attempted(NotificationResult::Failed { error }) => {
                ConfirmationResponse {
                    outcome: "failed".to_string(),
                    message_id: None,
                    error: Some(error),
                }
            }
            ResendOutcome::Skipped { status } => ConfirmationResponse {
                outcome: "skipped".to_string(),
                message_id: None,
                error: Some(format!("confirmation is already {}", status.as_str())),
            },
        }
    }
}

impl CreateOrderRequest {
    fn into_input(self) -> Result<CheckoutInput, AppError> {
        let items = self
            .items
            .into_iter()
            .map(|l| {
                let unit_price = BigDecimal::from_str(l.unit_price.trim()).map_err(|e| {
                    AppError::Validation(format!("Invalid unit_price '{}': {}", l.unit_price, e))
                })?;
                Ok(CartItem {
                    product_id: l.product_id,
                    size: l.size.trim().to_string(),
                    quantity: l.quantity,
                    unit_price,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(CheckoutInput {
            customer: Customer {
                name: self.customer.name,
                email: self.customer.email,
                phone: self.customer.phone,
            },
            items,
            shipping_address: self.shipping_address.into(),
            discount_code: self.discount_code,
        })
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only orders in this status (`pending`, `success`, `failed`).
    pub status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationParams {
    #[serde(default)]
    pub force: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Prices the cart and records it as a `pending` order awaiting payment.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid checkout"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;
    let order = state.orders.create_order(input).await?;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.get_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Newest first. Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let status = params
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()?;

    let result = state.orders.list_orders(status, page, limit).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// POST /orders/{id}/confirmation
///
/// Re-sends the confirmation email of a fulfilled order. Without `force`
/// nothing is sent when a previous send already succeeded.
#[utoipa::path(
    post,
    path = "/orders/{id}/confirmation",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("force" = Option<bool>, Query, description = "Send even if already sent"),
    ),
    responses(
        (status = 200, description = "Send attempted or skipped", body = ConfirmationResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order has not been fulfilled"),
    ),
    tag = "orders"
)]
pub async fn resend_confirmation(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ConfirmationParams>,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .fulfillment
        .resend_confirmation(path.into_inner(), query.force)
        .await?;
    Ok(HttpResponse::Ok().json(ConfirmationResponse::from(outcome)))
}
