use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Payment status as reported by the provider, collapsed to what fulfillment needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Rejected,
}

impl PaymentStatus {
    /// Maps a provider status string. Unknown statuses are treated as not final.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "approved" => PaymentStatus::Approved,
            "rejected" | "cancelled" | "refunded" | "charged_back" => PaymentStatus::Rejected,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// Authoritative payment data fetched from the provider.
#[derive(Debug, Clone)]
pub struct PaymentInfo {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub external_order_ref: Option<Uuid>,
    pub amount: BigDecimal,
}

/// Inbound webhook body: `{"type": "...", "data": {"id": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub id: serde_json::Value,
}

/// Longest payment id accepted from a webhook.
pub const MAX_PAYMENT_ID_LEN: usize = 64;

impl WebhookEvent {
    pub const PAYMENT: &'static str = "payment";

    pub fn payment(payment_id: impl Into<String>) -> Self {
        Self {
            event_type: Self::PAYMENT.to_string(),
            data: WebhookData {
                id: serde_json::Value::String(payment_id.into()),
            },
        }
    }

    pub fn is_payment(&self) -> bool {
        self.event_type == Self::PAYMENT
    }

    /// The referenced payment id; providers send it as a string or a number.
    ///
    /// Only ASCII letters, digits, `-` and `_` are accepted, since the id ends
    /// up in the provider lookup URL.
    pub fn payment_id(&self) -> Result<String, DomainError> {
        let id = match &self.data.id {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(DomainError::InvalidInput(format!(
                    "data.id must be a string or number, got {}",
                    other
                )))
            }
        };
        if id.is_empty() {
            return Err(DomainError::InvalidInput("data.id is empty".to_string()));
        }
        let well_formed = id.len() <= MAX_PAYMENT_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !well_formed {
            return Err(DomainError::InvalidInput(format!(
                "data.id must be at most {} letters, digits, '-' or '_'",
                MAX_PAYMENT_ID_LEN
            )));
        }
        Ok(id)
    }
}
