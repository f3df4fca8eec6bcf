use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::fulfillment::FulfillmentOutcome;
use crate::domain::payment::WebhookEvent;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub success: bool,
    /// `ignored`, `fulfilled`, `already_fulfilled`, `in_progress`, `payment_pending`
    /// or `payment_rejected`
    pub outcome: String,
    pub order_id: Option<String>,
    pub tracking_code: Option<String>,
}

impl From<&FulfillmentOutcome> for WebhookResponse {
    fn from(outcome: &FulfillmentOutcome) -> Self {
        let (order_id, tracking_code) = match outcome {
            FulfillmentOutcome::Ignored { .. } => (None, None),
            FulfillmentOutcome::PaymentPending { order_id }
            | FulfillmentOutcome::InProgress { order_id } => (Some(order_id.to_string()), None),
            FulfillmentOutcome::Fulfilled { order, .. }
            | FulfillmentOutcome::AlreadyFulfilled { order, .. }
            | FulfillmentOutcome::PaymentRejected { order } => {
                (Some(order.id.to_string()), order.tracking_code.clone())
            }
        };
        WebhookResponse {
            success: true,
            outcome: outcome.label().to_string(),
            order_id,
            tracking_code,
        }
    }
}

/// POST /webhooks/payments
///
/// Payment notification from the provider, `{"type": "payment", "data": {"id": ...}}`.
/// The body is only a hint: payment status and amount are re-fetched from the
/// provider before anything changes. Redelivering the same event is safe.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    request_body(content = String, description = "Provider webhook JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Event processed", body = WebhookResponse),
        (status = 400, description = "Malformed event"),
        (status = 404, description = "Payment or order not found"),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Paid amount does not cover the order"),
        (status = 503, description = "Payment provider unavailable"),
    ),
    tag = "webhooks"
)]
pub async fn payment_webhook(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook body: {}", e)))?;

    let outcome = state.fulfillment.handle_event(&event).await?;
    Ok(HttpResponse::Ok().json(WebhookResponse::from(&outcome)))
}
