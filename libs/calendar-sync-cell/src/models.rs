// libs/calendar-sync-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use agenda_cell::models::{Agendamento, CLINIC_TZ};

// ==============================================================================
// SYNC EVENT ENVELOPE
// ==============================================================================

/// Change notification pushed by the entity store when an appointment is
/// created, updated or deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncEventEnvelope {
    pub event: SyncEventInfo,
    #[serde(default)]
    pub data: Option<Agendamento>,
    #[serde(default)]
    pub old_data: Option<Agendamento>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncEventInfo {
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum SyncOutcome {
    Created { external_event_id: String },
    Updated,
    Deleted,
    Skipped { reason: String },
}

// ==============================================================================
// GOOGLE CALENDAR WIRE TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GoogleEventBody {
    pub summary: String,
    pub description: String,
    pub start: GoogleEventTime,
    pub end: GoogleEventTime,
}

/// Either `dateTime` (timed) or `date` (all-day), mirroring the API schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleEventTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub transparency: Option<String>,
    #[serde(default)]
    pub start: GoogleEventTime,
    #[serde(default)]
    pub end: GoogleEventTime,
}

impl GoogleEvent {
    /// Transparent events mark free time and are never imported.
    pub fn is_transparent(&self) -> bool {
        self.transparency.as_deref() == Some("transparent")
    }

    pub fn is_all_day(&self) -> bool {
        self.start.date.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleEventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCreatedEvent {
    pub id: String,
}

// ==============================================================================
// IMPORT REPORT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportItemResult {
    pub professional_id: String,
    pub created: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub total_created: u32,
    pub results: Vec<ImportItemResult>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImportTriggerRequest {
    pub professional_id: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("Missing appointment payload in {0} event")]
    MissingPayload(&'static str),

    #[error("Google Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("Feed not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

// ==============================================================================
// TIMEZONE HELPERS
// ==============================================================================

/// Interpret a local clinic date/time in the practice timezone.
pub fn clinic_datetime(date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    CLINIC_TZ
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| CLINIC_TZ.from_utc_datetime(&naive))
}

pub fn clinic_datetime_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    clinic_datetime(date, time).with_timezone(&Utc)
}
