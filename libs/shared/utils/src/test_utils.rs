use std::sync::Arc;

use shared_config::AppConfig;

/// Builder that points an AppConfig at mock servers so cell tests can run
/// against wiremock instead of live services.
pub struct TestConfig {
    pub store_url: String,
    pub notification_webhook_url: String,
    pub calendar_token_url: String,
    pub google_calendar_api_base: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:54321".to_string(),
            notification_webhook_url: String::new(),
            calendar_token_url: String::new(),
            google_calendar_api_base: "http://localhost:54322".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store(store_url: &str) -> Self {
        Self {
            store_url: store_url.to_string(),
            ..Default::default()
        }
    }

    pub fn notification_webhook(mut self, url: &str) -> Self {
        self.notification_webhook_url = url.to_string();
        self
    }

    pub fn calendar_token(mut self, url: &str) -> Self {
        self.calendar_token_url = url.to_string();
        self
    }

    pub fn google_api(mut self, url: &str) -> Self {
        self.google_calendar_api_base = url.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_api_key: "test-api-key".to_string(),
            store_service_token: "test-service-token".to_string(),
            notification_webhook_url: self.notification_webhook_url.clone(),
            notification_webhook_token: "test-webhook-token".to_string(),
            calendar_token_url: self.calendar_token_url.clone(),
            google_calendar_api_base: self.google_calendar_api_base.clone(),
            google_calendar_id: "primary".to_string(),
            http_timeout_secs: 5,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}
