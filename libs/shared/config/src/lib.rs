use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub store_service_token: String,
    pub notification_webhook_url: String,
    pub notification_webhook_token: String,
    pub calendar_token_url: String,
    pub google_calendar_api_base: String,
    pub google_calendar_id: String,
    pub http_timeout_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_api_key: env::var("STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            store_service_token: env::var("STORE_SERVICE_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("STORE_SERVICE_TOKEN not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .unwrap_or_default(),
            notification_webhook_token: env::var("NOTIFICATION_WEBHOOK_TOKEN")
                .unwrap_or_default(),
            calendar_token_url: env::var("CALENDAR_TOKEN_URL")
                .unwrap_or_default(),
            google_calendar_api_base: env::var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|_| "primary".to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_api_key.is_empty()
    }

    /// Notification dispatch falls back to mock mode when this is false.
    pub fn is_notification_configured(&self) -> bool {
        !self.notification_webhook_url.is_empty()
    }

    /// Outbound sync and import become no-ops when this is false.
    pub fn is_calendar_sync_configured(&self) -> bool {
        !self.calendar_token_url.is_empty()
    }
}
