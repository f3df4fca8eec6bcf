use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::notification::NotificationResult;
use crate::domain::order::{
    note_line, ListResult, NotificationStatus, Order, OrderDraft, OrderStatus, Transition,
    TransitionCheck, TransitionOutcome,
};
use crate::domain::ports::OrderStore;
use crate::schema::{order_lines, orders};

use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<actix_web::error::BlockingError> for DomainError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        DomainError::Internal(e.to_string())
    }
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Order, DomainError> {
    let order = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::OrderNotFound)?;

    let lines = OrderLineRow::belonging_to(&order)
        .select(OrderLineRow::as_select())
        .load(conn)?;

    order.into_order(lines)
}

fn ensure_exists(conn: &mut PgConnection, id: Uuid) -> Result<(), DomainError> {
    let exists: i64 = orders::table
        .filter(orders::id.eq(id))
        .count()
        .get_result(conn)?;
    if exists == 0 {
        return Err(DomainError::OrderNotFound);
    }
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderStore {
    pool: DbPool,
}

impl DieselOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for DieselOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut pooled = pool.get()?;
            let conn: &mut PgConnection = &mut pooled;
            let shipping_address = serde_json::to_value(&draft.shipping_address)
                .map_err(|e| DomainError::Internal(e.to_string()))?;

            conn.transaction::<_, DomainError, _>(|conn| {
                let order_id = Uuid::new_v4();
                diesel::insert_into(orders::table)
                    .values(&NewOrderRow {
                        id: order_id,
                        status: OrderStatus::Pending.as_str().to_string(),
                        total_amount: draft.total_amount.with_scale(2),
                        customer_name: draft.customer.name,
                        customer_email: draft.customer.email,
                        customer_phone: draft.customer.phone,
                        shipping_method: draft.shipping_address.method().as_str().to_string(),
                        shipping_address,
                        discount_code: draft.discount_code,
                        notes: note_line(Utc::now(), "order created"),
                    })
                    .execute(conn)?;

                let new_lines: Vec<NewOrderLineRow> = draft
                    .items
                    .into_iter()
                    .zip(0..)
                    .map(|(item, position)| NewOrderLineRow {
                        id: Uuid::new_v4(),
                        order_id,
                        position,
                        product_id: item.product_id,
                        size: item.size,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect();
                diesel::insert_into(order_lines::table)
                    .values(&new_lines)
                    .execute(conn)?;

                load_order(conn, order_id)
            })
        })
        .await?
    }

    async fn get(&self, id: Uuid) -> Result<Order, DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            load_order(&mut conn, id)
        })
        .await?
    }

    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut pooled = pool.get()?;
            let conn: &mut PgConnection = &mut pooled;
            let offset = (page - 1).max(0) * limit;

            conn.transaction::<_, DomainError, _>(|conn| {
                let mut count_query: orders::BoxedQuery<'static, Pg> = orders::table.into_boxed();
                let mut rows_query: orders::BoxedQuery<'static, Pg> = orders::table.into_boxed();
                if let Some(status) = status {
                    count_query = count_query.filter(orders::status.eq(status.as_str()));
                    rows_query = rows_query.filter(orders::status.eq(status.as_str()));
                }

                let total: i64 = count_query.count().get_result(conn)?;
                let rows: Vec<OrderRow> = rows_query
                    .select(OrderRow::as_select())
                    .order(orders::created_at.desc())
                    .limit(limit)
                    .offset(offset)
                    .load(conn)?;

                let lines = OrderLineRow::belonging_to(&rows)
                    .select(OrderLineRow::as_select())
                    .load(conn)?
                    .grouped_by(&rows);

                let items = rows
                    .into_iter()
                    .zip(lines)
                    .map(|(row, lines)| row.into_order(lines))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(ListResult { items, total })
            })
        })
        .await?
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<TransitionOutcome, DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            let target = transition.target();
            let now = Utc::now();
            let sources: Vec<&str> = OrderStatus::sources_for(target)
                .iter()
                .map(|s| s.as_str())
                .collect();

            // Compare-and-swap: only a row still in an allowed source status is written.
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq_any(sources)),
            )
            .set((
                orders::status.eq(target.as_str()),
                orders::tracking_code.eq(transition.tracking_code()),
                orders::payment_provider_id.eq(transition.payment_provider_id()),
                orders::notes.eq(orders::notes.concat(note_line(now, transition.note()))),
                orders::fulfillment_claimed_at.eq(None::<DateTime<Utc>>),
                orders::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

            let order = load_order(&mut conn, id)?;
            if updated == 1 {
                return Ok(TransitionOutcome::Applied(order));
            }

            match order.status.check_transition(target)? {
                TransitionCheck::AlreadyThere => Ok(TransitionOutcome::Unchanged(order)),
                TransitionCheck::Apply => Err(DomainError::Internal(format!(
                    "order {} changed while moving to {}",
                    id, target
                ))),
            }
        })
        .await?
    }

    async fn claim_fulfillment(&self, id: Uuid, lease: Duration) -> Result<bool, DomainError> {
        let pool = self.pool.clone();
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| DomainError::Internal(format!("claim lease: {}", e)))?;
        web::block(move || {
            let mut conn = pool.get()?;
            let now = Utc::now();
            let sources: Vec<&str> = OrderStatus::sources_for(OrderStatus::Success)
                .iter()
                .map(|s| s.as_str())
                .collect();

            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq_any(sources))
                    .filter(
                        orders::fulfillment_claimed_at
                            .is_null()
                            .or(orders::fulfillment_claimed_at.assume_not_null().lt(now - lease)),
                    ),
            )
            .set(orders::fulfillment_claimed_at.eq(Some(now)))
            .execute(&mut conn)?;

            if updated == 0 {
                ensure_exists(&mut conn, id)?;
            }
            Ok(updated == 1)
        })
        .await?
    }

    async fn release_fulfillment(&self, id: Uuid) -> Result<(), DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            let updated = diesel::update(orders::table.filter(orders::id.eq(id)))
                .set(orders::fulfillment_claimed_at.eq(None::<DateTime<Utc>>))
                .execute(&mut conn)?;
            if updated == 0 {
                return Err(DomainError::OrderNotFound);
            }
            Ok(())
        })
        .await?
    }

    async fn claim_notification(&self, id: Uuid, force: bool) -> Result<bool, DomainError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            let claimable: Vec<&str> = if force {
                vec![
                    NotificationStatus::Unsent.as_str(),
                    NotificationStatus::Sending.as_str(),
                    NotificationStatus::Sent.as_str(),
                    NotificationStatus::Failed.as_str(),
                ]
            } else {
                vec![
                    NotificationStatus::Unsent.as_str(),
                    NotificationStatus::Failed.as_str(),
                ]
            };

            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::notification_status.eq_any(claimable)),
            )
            .set((
                orders::notification_status.eq(NotificationStatus::Sending.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

            if updated == 0 {
                // Distinguish "someone else holds it" from "no such order".
                ensure_exists(&mut conn, id)?;
            }
            Ok(updated == 1)
        })
        .await?
    }

    async fn record_notification(
        &self,
        id: Uuid,
        result: &NotificationResult,
    ) -> Result<Order, DomainError> {
        let pool = self.pool.clone();
        let result = result.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            let now = Utc::now();
            let (status, message_id, note) = match result {
                NotificationResult::Sent { message_id } => (
                    NotificationStatus::Sent,
                    Some(message_id.clone()),
                    format!("confirmation sent ({})", message_id),
                ),
                NotificationResult::Failed { error } => (
                    NotificationStatus::Failed,
                    None,
                    format!("confirmation failed: {}", error),
                ),
            };

            let updated = diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::notification_status.eq(status.as_str()),
                    orders::notification_message_id.eq(message_id),
                    orders::notification_attempts.eq(orders::notification_attempts + 1),
                    orders::notes.eq(orders::notes.concat(note_line(now, &note))),
                    orders::updated_at.eq(now),
                ))
                .execute(&mut conn)?;
            if updated == 0 {
                return Err(DomainError::OrderNotFound);
            }

            load_order(&mut conn, id)
        })
        .await?
    }
}
