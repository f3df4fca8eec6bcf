use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{PaymentInfo, PaymentStatus};
use crate::domain::ports::PaymentVerifier;

/// Payment lookup against the provider's REST API (`GET /v1/payments/{id}`).
pub struct HttpPaymentVerifier {
    client: Client,
    base_url: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    #[serde(default)]
    external_reference: Option<String>,
    transaction_amount: serde_json::Value,
}

impl HttpPaymentVerifier {
    pub fn new(
        base_url: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("payment client: {}", e)))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| DomainError::Internal(format!("payment base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DomainError::Internal(format!(
                "payment base URL {} cannot take a path",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
        })
    }

    /// `{base}/v1/payments/{id}`, with the id encoded as a single path segment.
    fn payment_url(&self, payment_id: &str) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DomainError::Internal(format!("payment base URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v1", "payments", payment_id]);
        Ok(url)
    }
}

fn unavailable(payment_id: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::ProviderUnavailable(format!("payment {}: {}", payment_id, err))
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PaymentResponse {
    fn into_info(self, requested_id: &str) -> Result<PaymentInfo, DomainError> {
        let payment_id = json_text(&self.id);
        let amount = BigDecimal::from_str(&json_text(&self.transaction_amount)).map_err(|e| {
            unavailable(requested_id, format!("unreadable transaction_amount: {}", e))
        })?;

        let external_order_ref = match self.external_reference.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(reference) => match Uuid::parse_str(reference) {
                Ok(id) => Some(id),
                Err(_) => {
                    log::warn!(
                        "Payment {} references '{}', which is not an order id",
                        payment_id,
                        reference
                    );
                    None
                }
            },
        };

        Ok(PaymentInfo {
            payment_id,
            status: PaymentStatus::from_provider(&self.status),
            external_order_ref,
            amount,
        })
    }
}

#[async_trait]
impl PaymentVerifier for HttpPaymentVerifier {
    async fn fetch_status(&self, payment_id: &str) -> Result<PaymentInfo, DomainError> {
        let url = self.payment_url(payment_id)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| unavailable(payment_id, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DomainError::PaymentNotFound(payment_id.to_string())),
            status if !status.is_success() => {
                Err(unavailable(payment_id, format!("provider answered {}", status)))
            }
            _ => {
                let body: PaymentResponse = response
                    .json()
                    .await
                    .map_err(|e| unavailable(payment_id, e))?;
                body.into_info(payment_id)
            }
        }
    }
}
