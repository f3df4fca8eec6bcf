use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::inventory::StockShortfall;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        items: Vec<StockShortfall>,
    },

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::InvalidInput(_) => AppError::Validation(message),
            DomainError::OrderNotFound | DomainError::PaymentNotFound(_) => {
                AppError::NotFound(message)
            }
            DomainError::InsufficientStock(items) => AppError::Conflict { message, items },
            DomainError::InvalidTransition { .. } | DomainError::NotFulfilled(_) => {
                AppError::Conflict {
                    message,
                    items: Vec::new(),
                }
            }
            DomainError::AmountMismatch { .. } => AppError::Unprocessable(message),
            DomainError::ProviderUnavailable(_) => AppError::Unavailable(message),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::Conflict { items, .. } if !items.is_empty() => builder.json(json!({
                "error": self.to_string(),
                "items": items,
            })),
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                builder.json(json!({ "error": "Internal server error" }))
            }
            _ => builder.json(json!({ "error": self.to_string() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use crate::domain::order::OrderStatus;

    #[test]
    fn order_not_found_returns_404() {
        let err: AppError = DomainError::OrderNotFound.into();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn payment_not_found_returns_404() {
        let err: AppError = DomainError::PaymentNotFound("77".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_input_returns_400() {
        let err: AppError = DomainError::InvalidInput("bad value".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid input: bad value");
    }

    #[test]
    fn conflicts_return_409() {
        let transition: AppError = DomainError::InvalidTransition {
            from: OrderStatus::Success,
            to: OrderStatus::Failed,
        }
        .into();
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);

        let not_fulfilled: AppError = DomainError::NotFulfilled(Uuid::new_v4()).into();
        assert_eq!(not_fulfilled.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn amount_mismatch_returns_422() {
        let err: AppError = DomainError::AmountMismatch {
            paid: BigDecimal::from(5),
            expected: BigDecimal::from(10),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn provider_unavailable_returns_503() {
        let err: AppError = DomainError::ProviderUnavailable("timeout".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn shortfalls_are_listed_in_the_body() {
        let product_id = Uuid::new_v4();
        let err: AppError = DomainError::InsufficientStock(vec![StockShortfall {
            product_id,
            size: "M".to_string(),
            requested: 3,
            available: 1,
        }])
        .into();

        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["items"][0]["product_id"], product_id.to_string());
        assert_eq!(json["items"][0]["available"], 1);
    }

    #[actix_web::test]
    async fn internal_error_hides_details() {
        let err = AppError::Internal("connection refused".to_string());
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
