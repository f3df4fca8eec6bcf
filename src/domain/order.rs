use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::inventory::StockRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
        }
    }

    /// Statuses a conditional write may move away from to reach `target`.
    pub fn sources_for(target: OrderStatus) -> &'static [OrderStatus] {
        match target {
            OrderStatus::Success => &[OrderStatus::Pending, OrderStatus::Failed],
            OrderStatus::Failed => &[OrderStatus::Pending],
            OrderStatus::Pending => &[],
        }
    }

    /// Decides what a transition from `self` to `target` amounts to.
    ///
    /// `Success` is terminal: re-entering it is a no-op and nothing leaves it.
    pub fn check_transition(self, target: OrderStatus) -> Result<TransitionCheck, DomainError> {
        if self == target {
            return Ok(TransitionCheck::AlreadyThere);
        }
        if Self::sources_for(target).contains(&self) {
            Ok(TransitionCheck::Apply)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "success" => Ok(OrderStatus::Success),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    Apply,
    AlreadyThere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Home,
    Branch,
}

impl ShippingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ShippingMethod::Home => "home",
            ShippingMethod::Branch => "branch",
        }
    }
}

impl FromStr for ShippingMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(ShippingMethod::Home),
            "branch" => Ok(ShippingMethod::Branch),
            other => Err(DomainError::InvalidInput(format!(
                "unknown shipping method '{}'",
                other
            ))),
        }
    }
}

/// Delivery destination. The variant determines the shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ShippingAddress {
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

impl ShippingAddress {
    pub fn method(&self) -> ShippingMethod {
        match self {
            ShippingAddress::Home { .. } => ShippingMethod::Home,
            ShippingAddress::Branch { .. } => ShippingMethod::Branch,
        }
    }

    /// Single-line rendering used in emails and notes.
    pub fn summary(&self) -> String {
        match self {
            ShippingAddress::Home {
                recipient,
                street,
                city,
                province,
                postal_code,
            } => format!(
                "{}, {}, {} ({}), {}",
                recipient, street, city, postal_code, province
            ),
            ShippingAddress::Branch {
                branch_id,
                branch_name,
                city,
            } => format!("Branch {} #{}, {}", branch_name, branch_id, city),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// One line of the cart snapshot taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// A priced, validated order ready to be persisted as `pending`.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub discount_code: Option<String>,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unsent,
    Sending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::Unsent => "unsent",
            NotificationStatus::Sending => "sending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    /// Whether an automatic (non-forced) send may claim the notification.
    pub fn is_claimable(self) -> bool {
        matches!(self, NotificationStatus::Unsent | NotificationStatus::Failed)
    }
}

impl FromStr for NotificationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsent" => Ok(NotificationStatus::Unsent),
            "sending" => Ok(NotificationStatus::Sending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            other => Err(DomainError::Internal(format!(
                "unknown notification status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationState {
    pub status: NotificationStatus,
    pub message_id: Option<String>,
    pub attempts: i32,
}

impl Default for NotificationState {
    fn default() -> Self {
        Self {
            status: NotificationStatus::Unsent,
            message_id: None,
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub customer: Customer,
    pub discount_code: Option<String>,
    pub payment_provider_id: Option<String>,
    pub tracking_code: Option<String>,
    pub notes: String,
    pub notification: NotificationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn shipping_method(&self) -> ShippingMethod {
        self.shipping_address.method()
    }

    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total())
    }

    /// Stock the order needs, one request per cart line.
    pub fn stock_requests(&self) -> Vec<StockRequest> {
        self.items
            .iter()
            .map(|item| StockRequest {
                product_id: item.product_id,
                size: item.size.clone(),
                quantity: item.quantity,
            })
            .collect()
    }
}

/// Formats one audit line for `Order::notes`.
pub fn note_line(at: DateTime<Utc>, message: &str) -> String {
    format!("[{}] {}\n", at.to_rfc3339(), message)
}

/// A requested lifecycle change, applied by `OrderStore::transition` in one write.
#[derive(Debug, Clone)]
pub enum Transition {
    Succeed {
        tracking_code: String,
        payment_provider_id: String,
        note: String,
    },
    Fail {
        payment_provider_id: String,
        note: String,
    },
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Succeed { .. } => OrderStatus::Success,
            Transition::Fail { .. } => OrderStatus::Failed,
        }
    }

    pub fn note(&self) -> &str {
        match self {
            Transition::Succeed { note, .. } | Transition::Fail { note, .. } => note,
        }
    }

    pub fn payment_provider_id(&self) -> &str {
        match self {
            Transition::Succeed {
                payment_provider_id,
                ..
            }
            | Transition::Fail {
                payment_provider_id,
                ..
            } => payment_provider_id,
        }
    }

    pub fn tracking_code(&self) -> Option<&str> {
        match self {
            Transition::Succeed { tracking_code, .. } => Some(tracking_code),
            Transition::Fail { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// This call performed the write.
    Applied(Order),
    /// The order was already in the target status; nothing was written.
    Unchanged(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::Unchanged(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::Unchanged(order) => order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}
