use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use super::inventory::StockShortfall;
use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found")]
    OrderNotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Payment {0} not found at provider")]
    PaymentNotFound(String),
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Insufficient stock for {} item(s)", .0.len())]
    InsufficientStock(Vec<StockShortfall>),
    #[error("Paid amount {paid} does not cover order total {expected}")]
    AmountMismatch {
        paid: BigDecimal,
        expected: BigDecimal,
    },
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order {0} has not been fulfilled")]
    NotFulfilled(Uuid),
    #[error("Internal error: {0}")]
    Internal(String),
}
