//! In-memory adapters for every port, used by tests and local runs.
//!
//! Each store keeps its state behind one mutex so that every operation is
//! atomic, mirroring the conditional writes of the Postgres adapters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::{consolidate, StockRequest, StockShortfall};
use crate::domain::notification::NotificationResult;
use crate::domain::order::{
    note_line, ListResult, NotificationState, NotificationStatus, Order, OrderDraft, OrderStatus,
    Transition, TransitionCheck, TransitionOutcome,
};
use crate::domain::payment::{PaymentInfo, PaymentStatus};
use crate::domain::ports::{InventoryLedger, NotificationService, OrderStore, PaymentVerifier};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Orders ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<Mutex<Vec<Order>>>,
    // Locked after `orders` whenever both are held.
    claims: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_mut(orders: &mut [Order], id: Uuid) -> Result<&mut Order, DomainError> {
    orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or(DomainError::OrderNotFound)
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total_amount: draft.total_amount,
            items: draft.items,
            shipping_address: draft.shipping_address,
            customer: draft.customer,
            discount_code: draft.discount_code,
            payment_provider_id: None,
            tracking_code: None,
            notes: note_line(now, "order created"),
            notification: NotificationState::default(),
            created_at: now,
            updated_at: now,
        };
        lock(&self.orders).push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> Result<Order, DomainError> {
        lock(&self.orders)
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(DomainError::OrderNotFound)
    }

    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let orders = lock(&self.orders);
        let mut matching: Vec<&Order> = orders
            .iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from((page - 1).max(0) * limit).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(ListResult {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut orders = lock(&self.orders);
        let order = find_mut(&mut orders, id)?;

        match order.status.check_transition(transition.target())? {
            TransitionCheck::AlreadyThere => Ok(TransitionOutcome::Unchanged(order.clone())),
            TransitionCheck::Apply => {
                let now = Utc::now();
                order.status = transition.target();
                order.tracking_code = transition.tracking_code().map(str::to_string);
                order.payment_provider_id = Some(transition.payment_provider_id().to_string());
                order.notes.push_str(&note_line(now, transition.note()));
                order.updated_at = now;
                lock(&self.claims).remove(&id);
                Ok(TransitionOutcome::Applied(order.clone()))
            }
        }
    }

    async fn claim_fulfillment(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError> {
        let mut orders = lock(&self.orders);
        let order = find_mut(&mut orders, id)?;
        if !OrderStatus::sources_for(OrderStatus::Success).contains(&order.status) {
            return Ok(false);
        }

        let mut claims = lock(&self.claims);
        let now = Utc::now();
        let held = claims.get(&id).is_some_and(|claimed_at| {
            now.signed_duration_since(*claimed_at)
                .to_std()
                .map_or(true, |age| age < lease)
        });
        if held {
            return Ok(false);
        }
        claims.insert(id, now);
        Ok(true)
    }

    async fn release_fulfillment(&self, id: Uuid) -> Result<(), DomainError> {
        let mut orders = lock(&self.orders);
        find_mut(&mut orders, id)?;
        lock(&self.claims).remove(&id);
        Ok(())
    }

    async fn claim_notification(&self, id: Uuid, force: bool) -> Result<bool, DomainError> {
        let mut orders = lock(&self.orders);
        let order = find_mut(&mut orders, id)?;
        if !force && !order.notification.status.is_claimable() {
            return Ok(false);
        }
        order.notification.status = NotificationStatus::Sending;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_notification(
        &self,
        id: Uuid,
        result: &NotificationResult,
    ) -> Result<Order, DomainError> {
        let mut orders = lock(&self.orders);
        let order = find_mut(&mut orders, id)?;
        let now = Utc::now();
        order.notification.attempts += 1;
        match result {
            NotificationResult::Sent { message_id } => {
                order.notification.status = NotificationStatus::Sent;
                order.notification.message_id = Some(message_id.clone());
                order
                    .notes
                    .push_str(&note_line(now, &format!("confirmation sent ({})", message_id)));
            }
            NotificationResult::Failed { error } => {
                order.notification.status = NotificationStatus::Failed;
                order.notification.message_id = None;
                order
                    .notes
                    .push_str(&note_line(now, &format!("confirmation failed: {}", error)));
            }
        }
        order.updated_at = now;
        Ok(order.clone())
    }
}

// ── Inventory ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    stock: Arc<Mutex<HashMap<(Uuid, String), i32>>>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn reserve(&self, items: &[StockRequest]) -> Result<(), DomainError> {
        let requests = consolidate(items)?;
        let mut stock = lock(&self.stock);

        let shortfalls: Vec<StockShortfall> = requests
            .iter()
            .filter_map(|r| {
                let available = stock
                    .get(&(r.product_id, r.size.clone()))
                    .copied()
                    .unwrap_or(0);
                (available < r.quantity).then(|| StockShortfall {
                    product_id: r.product_id,
                    size: r.size.clone(),
                    requested: r.quantity,
                    available,
                })
            })
            .collect();
        if !shortfalls.is_empty() {
            return Err(DomainError::InsufficientStock(shortfalls));
        }

        for r in requests {
            if let Some(quantity) = stock.get_mut(&(r.product_id, r.size)) {
                *quantity -= r.quantity;
            }
        }
        Ok(())
    }

    async fn release(&self, items: &[StockRequest]) -> Result<(), DomainError> {
        let requests = consolidate(items)?;
        let mut stock = lock(&self.stock);
        for r in requests {
            *stock.entry((r.product_id, r.size)).or_insert(0) += r.quantity;
        }
        Ok(())
    }

    async fn available(&self, product_id: Uuid, size: &str) -> Result<i32, DomainError> {
        Ok(lock(&self.stock)
            .get(&(product_id, size.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn set_quantity(
        &self,
        product_id: Uuid,
        size: &str,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidInput(
                "quantity must not be negative".to_string(),
            ));
        }
        lock(&self.stock).insert((product_id, size.to_string()), quantity);
        Ok(())
    }
}

// ── Payment provider ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PaymentState {
    payments: HashMap<String, PaymentInfo>,
    unavailable: bool,
    delay: Option<Duration>,
    lookups: usize,
}

/// Payment provider stand-in holding registered payments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentVerifier {
    state: Arc<Mutex<PaymentState>>,
}

impl InMemoryPaymentVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        payment_id: &str,
        status: PaymentStatus,
        order_id: Option<Uuid>,
        amount: BigDecimal,
    ) {
        lock(&self.state).payments.insert(
            payment_id.to_string(),
            PaymentInfo {
                payment_id: payment_id.to_string(),
                status,
                external_order_ref: order_id,
                amount,
            },
        );
    }

    /// Makes every lookup fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn lookups(&self) -> usize {
        lock(&self.state).lookups
    }
}

#[async_trait]
impl PaymentVerifier for InMemoryPaymentVerifier {
    async fn fetch_status(&self, payment_id: &str) -> Result<PaymentInfo, DomainError> {
        let delay = {
            let mut state = lock(&self.state);
            state.lookups += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = lock(&self.state);
        if state.unavailable {
            return Err(DomainError::ProviderUnavailable(
                "provider marked unavailable".to_string(),
            ));
        }
        state
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| DomainError::PaymentNotFound(payment_id.to_string()))
    }
}

// ── Notifications ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct NotifierState {
    attempts: Vec<Uuid>,
    fail: bool,
    delay: Option<Duration>,
}

/// Records confirmation attempts instead of emailing anyone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    /// Order ids of every attempted send, in call order.
    pub fn attempts(&self) -> Vec<Uuid> {
        lock(&self.state).attempts.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotifier {
    async fn send_confirmation(&self, order: &Order) -> NotificationResult {
        let (fail, delay) = {
            let mut state = lock(&self.state);
            state.attempts.push(order.id);
            (state.fail, state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            NotificationResult::Failed {
                error: "simulated delivery failure".to_string(),
            }
        } else {
            NotificationResult::Sent {
                message_id: format!("mem-{}", Uuid::new_v4()),
            }
        }
    }
}
