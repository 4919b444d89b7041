// libs/calendar-sync-cell/src/services/connector.rs
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::SyncError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Resolves the external-calendar access token for a professional. The
/// lookup is keyed by professional id so per-professional OAuth grants can
/// plug in; the deployed endpoint currently answers with the single
/// operator-account token for every professional.
pub struct CalendarConnector {
    client: Client,
    token_url: String,
}

impl CalendarConnector {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            token_url: config.calendar_token_url.clone(),
        }
    }

    /// None means "no token available": callers treat the operation as a
    /// logged no-op, never as a failure.
    pub async fn access_token(&self, professional_id: &str) -> Result<Option<String>, SyncError> {
        if self.token_url.is_empty() {
            debug!("Calendar connector not configured, no token available");
            return Ok(None);
        }

        let response = self.client
            .get(&self.token_url)
            .query(&[("professional_id", professional_id)])
            .send()
            .await
            .map_err(|e| SyncError::TokenEndpoint(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Token endpoint failed ({}): {}", status, error_text);
            return Err(SyncError::TokenEndpoint(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::TokenEndpoint(e.to_string()))?;

        Ok(token.access_token.filter(|t| !t.is_empty()))
    }
}
