use std::collections::HashMap;

use bigdecimal::BigDecimal;

use super::errors::DomainError;
use super::order::{CartItem, ShippingMethod};

/// Shipping rates and the discount allow-list used to price a checkout.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub home_shipping: BigDecimal,
    pub branch_shipping: BigDecimal,
    /// Upper-cased code -> percent off the subtotal.
    discounts: HashMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: BigDecimal,
    pub shipping: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

impl PricingPolicy {
    pub fn new(
        home_shipping: BigDecimal,
        branch_shipping: BigDecimal,
        discounts: impl IntoIterator<Item = (String, u32)>,
    ) -> Self {
        Self {
            home_shipping,
            branch_shipping,
            discounts: discounts
                .into_iter()
                .map(|(code, percent)| (code.trim().to_uppercase(), percent.min(100)))
                .collect(),
        }
    }

    pub fn shipping_cost(&self, method: ShippingMethod) -> &BigDecimal {
        match method {
            ShippingMethod::Home => &self.home_shipping,
            ShippingMethod::Branch => &self.branch_shipping,
        }
    }

    pub fn discount_percent(&self, code: &str) -> Option<u32> {
        self.discounts.get(&code.trim().to_uppercase()).copied()
    }

    pub fn quote(
        &self,
        items: &[CartItem],
        method: ShippingMethod,
        discount_code: Option<&str>,
    ) -> Result<Quote, DomainError> {
        let zero = BigDecimal::from(0);
        let subtotal = items
            .iter()
            .fold(zero.clone(), |acc, item| acc + item.line_total());
        let shipping = self.shipping_cost(method).clone();

        let discount = match discount_code {
            Some(code) => {
                let percent = self.discount_percent(code).ok_or_else(|| {
                    DomainError::InvalidInput(format!("unknown discount code '{}'", code))
                })?;
                (&subtotal * BigDecimal::from(percent) / BigDecimal::from(100)).round(2)
            }
            None => zero.clone(),
        };

        let mut total = (&subtotal + &shipping - &discount).round(2);
        if total < zero {
            total = zero;
        }

        Ok(Quote {
            subtotal,
            shipping,
            discount,
            total,
        })
    }
}
