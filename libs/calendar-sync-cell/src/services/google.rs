// libs/calendar-sync-cell/src/services/google.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{
    GoogleCreatedEvent, GoogleEvent, GoogleEventBody, GoogleEventsResponse, SyncError,
};

/// Thin client over the Google Calendar v3 events endpoints. All calls are
/// bearer-token authenticated with the operator token handed out by the
/// connector; no retry is performed here.
pub struct GoogleCalendarClient {
    client: Client,
    api_base: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: config.google_calendar_api_base.clone(),
            calendar_id: config.google_calendar_id.clone(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_base, self.calendar_id)
    }

    pub async fn insert_event(
        &self,
        access_token: &str,
        body: &GoogleEventBody,
    ) -> Result<GoogleCreatedEvent, SyncError> {
        debug!("Creating remote calendar event: {}", body.summary);

        let response = self.client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Api { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Event creation failed ({}): {}", status, error_text);
            return Err(SyncError::Api { status: status.as_u16(), message: error_text });
        }

        response
            .json::<GoogleCreatedEvent>()
            .await
            .map_err(|e| SyncError::Api { status: status.as_u16(), message: e.to_string() })
    }

    pub async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        body: &GoogleEventBody,
    ) -> Result<(), SyncError> {
        debug!("Patching remote calendar event: {}", event_id);

        let url = format!("{}/{}", self.events_url(), event_id);
        let response = self.client
            .patch(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Api { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Event patch failed ({}): {}", status, error_text);
            return Err(SyncError::Api { status: status.as_u16(), message: error_text });
        }

        Ok(())
    }

    pub async fn delete_event(
        &self,
        access_token: &str,
        event_id: &str,
    ) -> Result<(), SyncError> {
        debug!("Deleting remote calendar event: {}", event_id);

        let url = format!("{}/{}", self.events_url(), event_id);
        let response = self.client
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Api { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Event deletion failed ({}): {}", status, error_text);
            return Err(SyncError::Api { status: status.as_u16(), message: error_text });
        }

        Ok(())
    }

    /// List events in `[time_min, time_max]` with recurring instances
    /// expanded, ordered by start time.
    pub async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<GoogleEvent>, SyncError> {
        debug!("Listing remote calendar events between {} and {}", time_min, time_max);

        let response = self.client
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Api { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Event listing failed ({}): {}", status, error_text);
            return Err(SyncError::Api { status: status.as_u16(), message: error_text });
        }

        let events: GoogleEventsResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Api { status: status.as_u16(), message: e.to_string() })?;

        Ok(events.items)
    }
}
