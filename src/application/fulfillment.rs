//! Payment-webhook driven order fulfillment.
//!
//! A delivery runs: verify payment -> resolve order -> claim the order ->
//! reserve stock -> mark `success` -> send confirmation. Everything up to the
//! status write is safe to repeat by re-delivering the webhook. The
//! confirmation is sent once, after the commit; retries go through
//! [`OrderFulfillmentWorkflow::resend_confirmation`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::StockRequest;
use crate::domain::notification::NotificationResult;
use crate::domain::order::{NotificationStatus, Order, OrderStatus, Transition, TransitionOutcome};
use crate::domain::payment::{PaymentInfo, PaymentStatus, WebhookEvent};
use crate::domain::ports::{InventoryLedger, NotificationService, OrderStore, PaymentVerifier};
use crate::domain::tracking::generate_tracking_code;

/// Log target for conditions an operator has to act on.
pub const ALERT_TARGET: &str = "storefront::alert";

#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    pub payment_timeout: Duration,
    pub notification_timeout: Duration,
    pub tracking_prefix: String,
    /// Age after which a fulfillment claim counts as abandoned.
    pub claim_lease: Duration,
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(5),
            notification_timeout: Duration::from_secs(5),
            tracking_prefix: "TRK".to_string(),
            claim_lease: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FulfillmentOutcome {
    /// Not a payment event; acknowledged without touching anything.
    Ignored { event_type: String },
    /// This delivery reserved stock and moved the order to `success`.
    Fulfilled {
        order: Order,
        notification: Option<NotificationResult>,
    },
    /// The order had already been fulfilled (replay or concurrent delivery).
    AlreadyFulfilled {
        order: Order,
        notification: Option<NotificationResult>,
    },
    /// Another delivery holds the order's fulfillment claim.
    InProgress { order_id: Uuid },
    /// The provider has not settled the payment yet.
    PaymentPending { order_id: Uuid },
    PaymentRejected { order: Order },
}

impl FulfillmentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FulfillmentOutcome::Ignored { .. } => "ignored",
            FulfillmentOutcome::Fulfilled { .. } => "fulfilled",
            FulfillmentOutcome::AlreadyFulfilled { .. } => "already_fulfilled",
            FulfillmentOutcome::InProgress { .. } => "in_progress",
            FulfillmentOutcome::PaymentPending { .. } => "payment_pending",
            FulfillmentOutcome::PaymentRejected { .. } => "payment_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Attempted(NotificationResult),
    /// Another send already succeeded or is in flight.
    Skipped { status: NotificationStatus },
}

pub struct OrderFulfillmentWorkflow {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryLedger>,
    payments: Arc<dyn PaymentVerifier>,
    notifier: Arc<dyn NotificationService>,
    settings: FulfillmentSettings,
}

impl OrderFulfillmentWorkflow {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryLedger>,
        payments: Arc<dyn PaymentVerifier>,
        notifier: Arc<dyn NotificationService>,
        settings: FulfillmentSettings,
    ) -> Self {
        Self {
            orders,
            inventory,
            payments,
            notifier,
            settings,
        }
    }

    /// Processes one webhook delivery.
    ///
    /// An error leaves the order and inventory as they were: a failed status
    /// write releases the reservation this delivery made, and the
    /// fulfillment claim is given back.
    pub async fn handle_event(
        &self,
        event: &WebhookEvent,
    ) -> Result<FulfillmentOutcome, DomainError> {
        if !event.is_payment() {
            log::info!("Ignoring webhook event of type '{}'", event.event_type);
            return Ok(FulfillmentOutcome::Ignored {
                event_type: event.event_type.clone(),
            });
        }

        let payment_id = event.payment_id()?;
        let payment = self.fetch_payment(&payment_id).await?;

        let Some(order_id) = payment.external_order_ref else {
            log::warn!(
                "Payment {} carries no usable order reference",
                payment.payment_id
            );
            return Err(DomainError::OrderNotFound);
        };
        let order = self.orders.get(order_id).await?;

        if order.status == OrderStatus::Success {
            log::info!(
                "Order {} already fulfilled; acknowledging replay of payment {}",
                order.id,
                payment.payment_id
            );
            return Ok(FulfillmentOutcome::AlreadyFulfilled {
                order,
                notification: None,
            });
        }

        match payment.status {
            PaymentStatus::Pending => {
                log::info!(
                    "Payment {} for order {} still pending; nothing to do",
                    payment.payment_id,
                    order.id
                );
                return Ok(FulfillmentOutcome::PaymentPending { order_id: order.id });
            }
            PaymentStatus::Rejected => return self.reject(order, &payment).await,
            PaymentStatus::Approved => {}
        }

        if payment.amount.round(2) < order.total_amount.round(2) {
            log::error!(
                target: ALERT_TARGET,
                "Payment {} for order {} paid {} but the order total is {}; left pending",
                payment.payment_id,
                order.id,
                payment.amount,
                order.total_amount
            );
            return Err(DomainError::AmountMismatch {
                paid: payment.amount,
                expected: order.total_amount,
            });
        }

        if !self
            .orders
            .claim_fulfillment(order.id, self.settings.claim_lease)
            .await?
        {
            return self.yield_to_concurrent_delivery(order.id, &payment).await;
        }

        let outcome = self.fulfil(order, &payment).await;
        if outcome.is_err() {
            if let Err(err) = self.orders.release_fulfillment(order_id).await {
                log::warn!(
                    "Could not release fulfillment claim on order {}: {}; it lapses after {:?}",
                    order_id,
                    err,
                    self.settings.claim_lease
                );
            }
        }
        outcome
    }

    /// Reserves stock and moves a claimed order to `success`.
    async fn fulfil(
        &self,
        order: Order,
        payment: &PaymentInfo,
    ) -> Result<FulfillmentOutcome, DomainError> {
        let stock = order.stock_requests();
        if let Err(err) = self.inventory.reserve(&stock).await {
            if let DomainError::InsufficientStock(shortfalls) = &err {
                let current = self.orders.get(order.id).await?;
                // Only after a lapsed claim let another delivery in.
                if current.status == OrderStatus::Success {
                    log::warn!(
                        "Order {} was fulfilled while payment {} waited for stock",
                        current.id,
                        payment.payment_id
                    );
                    return Ok(FulfillmentOutcome::AlreadyFulfilled {
                        order: current,
                        notification: None,
                    });
                }
                log::error!(
                    target: ALERT_TARGET,
                    "Order {} paid by {} cannot be fulfilled, stock short on {:?}; left pending for reconciliation",
                    order.id,
                    payment.payment_id,
                    shortfalls
                );
            }
            return Err(err);
        }

        let tracking_code = generate_tracking_code(&self.settings.tracking_prefix, Utc::now());
        let transition = Transition::Succeed {
            tracking_code,
            payment_provider_id: payment.payment_id.clone(),
            note: format!("payment {} approved for {}", payment.payment_id, payment.amount),
        };

        let order_id = order.id;
        match self.orders.transition(order_id, transition).await {
            Ok(TransitionOutcome::Applied(order)) => {
                log::info!(
                    "Order {} fulfilled by payment {} (tracking {})",
                    order.id,
                    payment.payment_id,
                    order.tracking_code.as_deref().unwrap_or_default()
                );
                let notification = self.notify_best_effort(&order).await;
                Ok(FulfillmentOutcome::Fulfilled {
                    order,
                    notification,
                })
            }
            Ok(TransitionOutcome::Unchanged(order)) => {
                log::warn!(
                    "Order {} was fulfilled by a concurrent delivery; returning duplicate reservation",
                    order.id
                );
                self.release_reservation(order.id, &stock).await;
                let notification = self.notify_best_effort(&order).await;
                Ok(FulfillmentOutcome::AlreadyFulfilled {
                    order,
                    notification,
                })
            }
            Err(err) => {
                self.release_reservation(order_id, &stock).await;
                Err(err)
            }
        }
    }

    /// Answers a delivery that lost the fulfillment claim.
    async fn yield_to_concurrent_delivery(
        &self,
        order_id: Uuid,
        payment: &PaymentInfo,
    ) -> Result<FulfillmentOutcome, DomainError> {
        let order = self.orders.get(order_id).await?;
        if order.status == OrderStatus::Success {
            log::info!(
                "Order {} was fulfilled by a concurrent delivery; acknowledging payment {}",
                order.id,
                payment.payment_id
            );
            let notification = self.notify_best_effort(&order).await;
            return Ok(FulfillmentOutcome::AlreadyFulfilled {
                order,
                notification,
            });
        }

        log::info!(
            "Order {} is being fulfilled by another delivery; acknowledging payment {}",
            order.id,
            payment.payment_id
        );
        Ok(FulfillmentOutcome::InProgress { order_id })
    }

    /// Sends the confirmation of a fulfilled order again, from stored state.
    ///
    /// Without `force` nothing is sent if a previous send succeeded or is in flight.
    pub async fn resend_confirmation(
        &self,
        order_id: Uuid,
        force: bool,
    ) -> Result<ResendOutcome, DomainError> {
        let order = self.orders.get(order_id).await?;
        if order.status != OrderStatus::Success {
            return Err(DomainError::NotFulfilled(order.id));
        }

        match self.dispatch_confirmation(&order, force).await? {
            Some(result) => Ok(ResendOutcome::Attempted(result)),
            None => Ok(ResendOutcome::Skipped {
                status: order.notification.status,
            }),
        }
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentInfo, DomainError> {
        match timeout(
            self.settings.payment_timeout,
            self.payments.fetch_status(payment_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DomainError::ProviderUnavailable(format!(
                "payment lookup for {} timed out after {:?}",
                payment_id, self.settings.payment_timeout
            ))),
        }
    }

    async fn reject(
        &self,
        order: Order,
        payment: &PaymentInfo,
    ) -> Result<FulfillmentOutcome, DomainError> {
        let transition = Transition::Fail {
            payment_provider_id: payment.payment_id.clone(),
            note: format!("payment {} rejected", payment.payment_id),
        };

        match self.orders.transition(order.id, transition).await {
            Ok(outcome) => {
                log::info!(
                    "Order {} marked failed after payment {} was rejected",
                    order.id,
                    payment.payment_id
                );
                Ok(FulfillmentOutcome::PaymentRejected {
                    order: outcome.into_order(),
                })
            }
            // A concurrent delivery fulfilled it between our read and write.
            Err(DomainError::InvalidTransition {
                from: OrderStatus::Success,
                ..
            }) => {
                let order = self.orders.get(order.id).await?;
                Ok(FulfillmentOutcome::AlreadyFulfilled {
                    order,
                    notification: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn release_reservation(&self, order_id: Uuid, stock: &[StockRequest]) {
        if let Err(err) = self.inventory.release(stock).await {
            log::error!(
                target: ALERT_TARGET,
                "Could not release reservation made for order {}: {}; inventory needs manual correction",
                order_id,
                err
            );
        }
    }

    async fn notify_best_effort(&self, order: &Order) -> Option<NotificationResult> {
        match self.dispatch_confirmation(order, false).await {
            Ok(result) => result,
            Err(err) => {
                log::error!(
                    "Could not start confirmation for order {}: {}",
                    order.id,
                    err
                );
                None
            }
        }
    }

    /// Claims, sends and records one confirmation. `None` when the claim fails.
    async fn dispatch_confirmation(
        &self,
        order: &Order,
        force: bool,
    ) -> Result<Option<NotificationResult>, DomainError> {
        if !self.orders.claim_notification(order.id, force).await? {
            log::debug!(
                "Confirmation for order {} already sent or in flight",
                order.id
            );
            return Ok(None);
        }

        let result = match timeout(
            self.settings.notification_timeout,
            self.notifier.send_confirmation(order),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => NotificationResult::Failed {
                error: format!(
                    "timed out after {:?}",
                    self.settings.notification_timeout
                ),
            },
        };

        match &result {
            NotificationResult::Sent { message_id } => log::info!(
                "Confirmation for order {} sent to {} (message {})",
                order.id,
                order.customer.email,
                message_id
            ),
            NotificationResult::Failed { error } => log::warn!(
                "Confirmation for order {} failed: {}; retry with a re-send",
                order.id,
                error
            ),
        }

        if let Err(err) = self.orders.record_notification(order.id, &result).await {
            log::error!(
                "Could not record confirmation outcome for order {}: {}",
                order.id,
                err
            );
        }
        Ok(Some(result))
    }
}
