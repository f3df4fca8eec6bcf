use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::notification::{render_confirmation, NotificationResult};
use crate::domain::order::Order;
use crate::domain::ports::NotificationService;

/// Sends confirmations through a transactional email API (`POST /emails`).
pub struct HttpEmailNotifier {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
    store_name: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

impl HttpEmailNotifier {
    pub fn new(
        base_url: &str,
        api_key: &str,
        from: &str,
        store_name: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("email client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            store_name: store_name.to_string(),
        })
    }

    async fn send(&self, order: &Order) -> Result<String, String> {
        let email = render_confirmation(order, &self.store_name).map_err(|e| e.to_string())?;
        let body = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html_body,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("email API answered {}: {}", status, detail.trim()));
        }

        let sent: SendEmailResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(sent.id)
    }
}

#[async_trait]
impl NotificationService for HttpEmailNotifier {
    async fn send_confirmation(&self, order: &Order) -> NotificationResult {
        match self.send(order).await {
            Ok(message_id) => NotificationResult::Sent { message_id },
            Err(error) => NotificationResult::Failed { error },
        }
    }
}
