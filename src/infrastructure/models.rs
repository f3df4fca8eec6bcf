use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CartItem, Customer, NotificationState, Order, ShippingAddress};
use crate::schema::{inventory, order_lines, orders};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub discount_code: Option<String>,
    pub payment_provider_id: Option<String>,
    pub tracking_code: Option<String>,
    pub notes: String,
    pub notification_status: String,
    pub notification_message_id: Option<String>,
    pub notification_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_method: String,
    pub shipping_address: Value,
    pub discount_code: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory)]
pub struct InventoryRow {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Assembles the domain order; `lines` must belong to this row.
    pub fn into_order(self, mut lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        lines.sort_by_key(|l| l.position);

        let shipping_address: ShippingAddress = serde_json::from_value(self.shipping_address)
            .map_err(|e| {
                DomainError::Internal(format!(
                    "order {} has an unreadable shipping address: {}",
                    self.id, e
                ))
            })?;

        Ok(Order {
            id: self.id,
            status: self.status.parse()?,
            total_amount: self.total_amount,
            items: lines
                .into_iter()
                .map(|l| CartItem {
                    product_id: l.product_id,
                    size: l.size,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            shipping_address,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            discount_code: self.discount_code,
            payment_provider_id: self.payment_provider_id,
            tracking_code: self.tracking_code,
            notes: self.notes,
            notification: NotificationState {
                status: self.notification_status.parse()?,
                message_id: self.notification_message_id,
                attempts: self.notification_attempts,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
