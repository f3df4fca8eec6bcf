use std::sync::Arc;

use crate::application::fulfillment::{FulfillmentSettings, OrderFulfillmentWorkflow};
use crate::application::order_service::OrderService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{InventoryLedger, NotificationService, OrderStore, PaymentVerifier};
use crate::domain::pricing::PricingPolicy;
use crate::infrastructure::email_client::HttpEmailNotifier;
use crate::infrastructure::inventory_repo::DieselInventoryLedger;
use crate::infrastructure::order_repo::DieselOrderStore;
use crate::infrastructure::payment_client::HttpPaymentVerifier;

/// Shared handler state, wired once at startup.
pub struct AppState {
    pub orders: OrderService,
    pub fulfillment: OrderFulfillmentWorkflow,
    pub inventory: Arc<dyn InventoryLedger>,
}

impl AppState {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryLedger>,
        payments: Arc<dyn PaymentVerifier>,
        notifier: Arc<dyn NotificationService>,
        pricing: PricingPolicy,
        settings: FulfillmentSettings,
    ) -> Self {
        Self {
            orders: OrderService::new(orders.clone(), pricing),
            fulfillment: OrderFulfillmentWorkflow::new(
                orders,
                inventory.clone(),
                payments,
                notifier,
                settings,
            ),
            inventory,
        }
    }

    /// Production wiring: Postgres stores plus the HTTP payment and email adapters.
    pub fn from_config(config: &AppConfig, pool: DbPool) -> Result<Self, DomainError> {
        let payments = HttpPaymentVerifier::new(
            &config.payment_api_base_url,
            &config.payment_access_token,
            config.payment_timeout,
        )?;
        let notifier = HttpEmailNotifier::new(
            &config.email_api_base_url,
            &config.email_api_key,
            &config.email_from,
            &config.store_name,
            config.email_timeout,
        )?;

        Ok(Self::new(
            Arc::new(DieselOrderStore::new(pool.clone())),
            Arc::new(DieselInventoryLedger::new(pool)),
            Arc::new(payments),
            Arc::new(notifier),
            PricingPolicy::new(
                config.shipping_home_cost.clone(),
                config.shipping_branch_cost.clone(),
                config.discount_codes.clone(),
            ),
            FulfillmentSettings {
                payment_timeout: config.payment_timeout,
                notification_timeout: config.email_timeout,
                tracking_prefix: config.tracking_prefix.clone(),
                ..FulfillmentSettings::default()
            },
        ))
    }
}
