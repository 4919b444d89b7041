// libs/notification-cell/src/services/notifier.rs
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::NotificationError;

/// Proxies messages to the configured notification webhook. When no webhook
/// is configured the sender runs in mock mode: the message is logged and the
/// dispatch reports success, so environments without a messaging provider
/// keep working.
pub struct NotificationSender {
    client: Client,
    webhook_url: String,
    webhook_token: String,
}

impl NotificationSender {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            webhook_url: config.notification_webhook_url.clone(),
            webhook_token: config.notification_webhook_token.clone(),
        }
    }

    pub async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        if self.webhook_url.is_empty() {
            warn!("Notification webhook not configured, mock-sending to {}", phone);
            return Ok(());
        }

        debug!("Dispatching notification to {}", phone);

        let mut request = self.client.post(&self.webhook_url).json(&json!({
            "phone": phone,
            "message": message
        }));

        if !self.webhook_token.is_empty() {
            request = request.bearer_auth(&self.webhook_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Webhook(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Notification webhook failed ({}): {}", status, error_text);
            return Err(NotificationError::Webhook(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
