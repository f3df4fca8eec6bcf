use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::DomainError;
use super::inventory::StockRequest;
use super::notification::NotificationResult;
use super::order::{ListResult, Order, OrderDraft, OrderStatus, Transition, TransitionOutcome};
use super::payment::PaymentInfo;

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn create(&self, draft: OrderDraft) -> Result<Order, DomainError>;

    /// Fails with `DomainError::OrderNotFound` when the id is unknown.
    async fn get(&self, id: Uuid) -> Result<Order, DomainError>;

    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError>;

    /// Applies `transition` with a compare-and-swap on the current status.
    ///
    /// Returns `Unchanged` when the order already sits in the target status,
    /// and `InvalidTransition` when the move is not allowed (leaving `success`).
    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<TransitionOutcome, DomainError>;

    /// Takes the exclusive right to fulfil a `pending` or `failed` order.
    ///
    /// Returns `false` while another delivery holds a claim younger than
    /// `lease`, or when the order can no longer move to `success`. The claim
    /// is cleared by any status transition or by `release_fulfillment`.
    async fn claim_fulfillment(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError>;

    async fn release_fulfillment(&self, id: Uuid) -> Result<(), DomainError>;

    /// Marks the confirmation as `sending` if nobody else holds it.
    ///
    /// Without `force` only `unsent` or `failed` notifications can be claimed.
    async fn claim_notification(&self, id: Uuid, force: bool) -> Result<bool, DomainError>;

    async fn record_notification(
        &self,
        id: Uuid,
        result: &NotificationResult,
    ) -> Result<Order, DomainError>;
}

#[async_trait]
pub trait InventoryLedger: Send + Sync + 'static {
    /// Decrements every requested line or none of them.
    async fn reserve(&self, items: &[StockRequest]) -> Result<(), DomainError>;

    async fn release(&self, items: &[StockRequest]) -> Result<(), DomainError>;

    async fn available(&self, product_id: Uuid, size: &str) -> Result<i32, DomainError>;

    async fn set_quantity(
        &self,
        product_id: Uuid,
        size: &str,
        quantity: i32,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait PaymentVerifier: Send + Sync + 'static {
    async fn fetch_status(&self, payment_id: &str) -> Result<PaymentInfo, DomainError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync + 'static {
    async fn send_confirmation(&self, order: &Order) -> NotificationResult;
}
