use askama::Template;
use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::Order;

/// Outcome of a confirmation send. Senders report failure as a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum NotificationResult {
    Sent { message_id: String },
    Failed { error: String },
}

impl NotificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, NotificationResult::Sent { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Template)]
#[template(path = "order_confirmation.html")]
struct ConfirmationPage<'a> {
    store: &'a str,
    name: &'a str,
    order_id: Uuid,
    tracking: &'a str,
    lines: Vec<LineView<'a>>,
    subtotal: String,
    total: String,
    method: &'a str,
    address: String,
    phone: &'a str,
}

struct LineView<'a> {
    product_id: Uuid,
    size: &'a str,
    quantity: i32,
    unit_price: String,
    line_total: String,
}

/// Renders the order-confirmation email from the stored order alone.
///
/// Every interpolated value is HTML-escaped by the template.
pub fn render_confirmation(
    order: &Order,
    store_name: &str,
) -> Result<ConfirmationEmail, DomainError> {
    let tracking = order.tracking_code.as_deref().unwrap_or("-");
    let page = ConfirmationPage {
        store: store_name,
        name: &order.customer.name,
        order_id: order.id,
        tracking,
        lines: order
            .items
            .iter()
            .map(|item| LineView {
                product_id: item.product_id,
                size: &item.size,
                quantity: item.quantity,
                unit_price: item.unit_price.with_scale(2).to_string(),
                line_total: item.line_total().with_scale(2).to_string(),
            })
            .collect(),
        subtotal: order.subtotal().with_scale(2).to_string(),
        total: order.total_amount.with_scale(2).to_string(),
        method: order.shipping_method().as_str(),
        address: order.shipping_address.summary(),
        phone: &order.customer.phone,
    };
    let html_body = page
        .render()
        .map_err(|e| DomainError::Internal(format!("confirmation template: {}", e)))?;

    Ok(ConfirmationEmail {
        to: order.customer.email.clone(),
        subject: format!("{}: order confirmed ({})", store_name, tracking),
        html_body,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::order::{
        CartItem, Customer, NotificationState, OrderStatus, ShippingAddress,
    };

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Success,
            total_amount: BigDecimal::from_str("125.50").unwrap(),
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                size: "M".to_string(),
                quantity: 2,
                unit_price: BigDecimal::from_str("60.25").unwrap(),
            }],
            shipping_address: ShippingAddress::Home {
                recipient: "Ana <Admin>".to_string(),
                street: "Av. Siempre Viva 742".to_string(),
                city: "Cordoba".to_string(),
                province: "Cordoba".to_string(),
                postal_code: "5000".to_string(),
            },
            customer: Customer {
                name: "Ana & Co".to_string(),
                email: "ana@example.com".to_string(),
                phone: "+54 351 555 0000".to_string(),
            },
            discount_code: None,
            payment_provider_id: Some("123".to_string()),
            tracking_code: Some("TRK-ABC-1234".to_string()),
            notes: String::new(),
            notification: NotificationState::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_includes_tracking_and_totals() {
        let email = render_confirmation(&order(), "Tienda").unwrap();

        assert_eq!(email.to, "ana@example.com");
        assert_eq!(email.subject, "Tienda: order confirmed (TRK-ABC-1234)");
        assert!(email.html_body.contains("TRK-ABC-1234"));
        assert!(email.html_body.contains("$120.50"));
        assert!(email.html_body.contains("$125.50"));
        assert!(email.html_body.contains("Shipping (home)"));
    }

    #[test]
    fn confirmation_escapes_customer_text() {
        let email = render_confirmation(&order(), "Tienda").unwrap();

        assert!(email.html_body.contains("Ana &amp; Co"));
        assert!(email.html_body.contains("Ana &lt;Admin&gt;"));
        assert!(!email.html_body.contains("<Admin>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let order = order();
        assert_eq!(
            render_confirmation(&order, "Tienda").unwrap(),
            render_confirmation(&order, "Tienda").unwrap()
        );
    }
}
