use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    CartItem, Customer, ListResult, Order, OrderDraft, OrderStatus, ShippingAddress,
};
use crate::domain::ports::OrderStore;
use crate::domain::pricing::PricingPolicy;

/// A checkout submission as received from the storefront.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub discount_code: Option<String>,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    pricing: PricingPolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, pricing: PricingPolicy) -> Self {
        Self { store, pricing }
    }

    /// Validates and prices the checkout, then records it as a `pending` order.
    pub async fn create_order(&self, input: CheckoutInput) -> Result<Order, DomainError> {
        validate(&input)?;

        let discount_code = input
            .discount_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        let quote = self.pricing.quote(
            &input.items,
            input.shipping_address.method(),
            discount_code.as_deref(),
        )?;

        let order = self
            .store
            .create(OrderDraft {
                customer: input.customer,
                items: input.items,
                shipping_address: input.shipping_address,
                discount_code,
                total_amount: quote.total,
            })
            .await?;

        log::info!(
            "Created order {} for {} ({} line(s), total {})",
            order.id,
            order.customer.email,
            order.items.len(),
            order.total_amount
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.store.get(id).await
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.store.list(status, page, limit).await
    }
}

fn invalid(msg: &str) -> Result<(), DomainError> {
    Err(DomainError::InvalidInput(msg.to_string()))
}

fn validate(input: &CheckoutInput) -> Result<(), DomainError> {
    if input.items.is_empty() {
        return invalid("cart is empty");
    }
    for item in &input.items {
        if item.quantity < 1 {
            return invalid("quantity must be at least 1");
        }
        if item.unit_price < BigDecimal::from(0) {
            return invalid("unit_price must not be negative");
        }
        if item.size.trim().is_empty() {
            return invalid("size is required");
        }
    }

    let customer = &input.customer;
    if customer.name.trim().is_empty() {
        return invalid("customer name is required");
    }
    if !customer.email.contains('@') {
        return invalid("customer email is invalid");
    }
    if customer.phone.trim().is_empty() {
        return invalid("customer phone is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::infrastructure::memory::InMemoryOrderStore;

    fn service() -> OrderService {
        let pricing = PricingPolicy::new(
            BigDecimal::from(1000),
            BigDecimal::from(500),
            vec![("WELCOME10".to_string(), 10)],
        );
        OrderService::new(Arc::new(InMemoryOrderStore::new()), pricing)
    }

    fn input() -> CheckoutInput {
        CheckoutInput {
            customer: Customer {
                name: "Lucia".to_string(),
                email: "lucia@example.com".to_string(),
                phone: "1155550000".to_string(),
            },
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                size: "M".to_string(),
                quantity: 2,
                unit_price: BigDecimal::from_str("2500.00").unwrap(),
            }],
            shipping_address: ShippingAddress::Branch {
                branch_id: "7".to_string(),
                branch_name: "Palermo".to_string(),
                city: "CABA".to_string(),
            },
            discount_code: Some("welcome10".to_string()),
        }
    }

    #[tokio::test]
    async fn create_order_prices_and_stores_pending_order() {
        let service = service();

        let order = service.create_order(input()).await.expect("create failed");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, BigDecimal::from(5000));
        assert_eq!(order.discount_code.as_deref(), Some("WELCOME10"));
        assert!(order.tracking_code.is_none());

        let fetched = service.get_order(order.id).await.expect("get failed");
        assert_eq!(fetched.id, order.id);
    }

    #[tokio::test]
    async fn create_order_rejects_empty_cart() {
        let mut input = input();
        input.items.clear();

        let err = service().create_order(input).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_order_rejects_bad_email() {
        let mut input = input();
        input.customer.email = "not-an-email".to_string();

        let err = service().create_order(input).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn blank_discount_code_is_ignored() {
        let mut input = input();
        input.discount_code = Some("  ".to_string());

        let order = service().create_order(input).await.expect("create failed");
        assert!(order.discount_code.is_none());
        assert_eq!(order.total_amount, BigDecimal::from(5500));
    }

    #[tokio::test]
    async fn list_orders_filters_by_status() {
        let service = service();
        service.create_order(input()).await.expect("create failed");
        service.create_order(input()).await.expect("create failed");

        let pending = service
            .list_orders(Some(OrderStatus::Pending), 1, 10)
            .await
            .expect("list failed");
        assert_eq!(pending.total, 2);

        let succeeded = service
            .list_orders(Some(OrderStatus::Success), 1, 10)
            .await
            .expect("list failed");
        assert_eq!(succeeded.total, 0);
        assert!(succeeded.items.is_empty());
    }
}
