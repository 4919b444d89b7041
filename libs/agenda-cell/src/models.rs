// libs/agenda-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// All schedule arithmetic happens in the practice's local timezone.
pub const CLINIC_TZ: Tz = chrono_tz::America::Sao_Paulo;

pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 30;

// ==============================================================================
// WIRE FORMAT HELPERS
// ==============================================================================

/// Times travel as "HH:mm" strings; the store also holds legacy "HH:mm:ss"
/// values, which are accepted on read.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where D: Deserializer<'de> {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse(value: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
    }
}

pub mod hhmm_option {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        match time {
            Some(t) => serializer.serialize_some(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where D: Deserializer<'de> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => super::hhmm::parse(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agendamento {
    pub id: String,
    pub professional_id: String,
    pub professional_name: String,
    pub patient_id: String,
    pub patient_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    pub tipo: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub followup_sent: bool,
    #[serde(default)]
    pub external_event_id: Option<String>,
}

impl Agendamento {
    /// Appointments without an explicit end run for the default 30 minutes.
    pub fn effective_end_time(&self) -> NaiveTime {
        self.end_time
            .unwrap_or(self.start_time + Duration::minutes(DEFAULT_APPOINTMENT_MINUTES))
    }

    pub fn occupies_slot(&self) -> bool {
        !matches!(self.status, AppointmentStatus::Cancelado | AppointmentStatus::Faltou)
    }
}

/// Lifecycle of an appointment at the front desk. Transitions only move
/// forward; cancellation is reachable from every non-terminal state and
/// no-show only before triage starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Agendado,
    Recepcionado,
    EmTriagem,
    AguardandoAtendimento,
    EmAtendimento,
    Realizado,
    Cancelado,
    Faltou,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Agendado => write!(f, "agendado"),
            AppointmentStatus::Recepcionado => write!(f, "recepcionado"),
            AppointmentStatus::EmTriagem => write!(f, "em_triagem"),
            AppointmentStatus::AguardandoAtendimento => write!(f, "aguardando_atendimento"),
            AppointmentStatus::EmAtendimento => write!(f, "em_atendimento"),
            AppointmentStatus::Realizado => write!(f, "realizado"),
            AppointmentStatus::Cancelado => write!(f, "cancelado"),
            AppointmentStatus::Faltou => write!(f, "faltou"),
        }
    }
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Realizado | AppointmentStatus::Cancelado | AppointmentStatus::Faltou
        )
    }

    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Agendado => vec![
                AppointmentStatus::Recepcionado,
                AppointmentStatus::Cancelado,
                AppointmentStatus::Faltou,
            ],
            AppointmentStatus::Recepcionado => vec![
                AppointmentStatus::EmTriagem,
                AppointmentStatus::Cancelado,
                AppointmentStatus::Faltou,
            ],
            AppointmentStatus::EmTriagem => vec![
                AppointmentStatus::AguardandoAtendimento,
                AppointmentStatus::Cancelado,
            ],
            AppointmentStatus::AguardandoAtendimento => vec![
                AppointmentStatus::EmAtendimento,
                AppointmentStatus::Cancelado,
            ],
            AppointmentStatus::EmAtendimento => vec![
                AppointmentStatus::Realizado,
                AppointmentStatus::Cancelado,
            ],
            // Terminal states
            AppointmentStatus::Realizado => vec![],
            AppointmentStatus::Cancelado => vec![],
            AppointmentStatus::Faltou => vec![],
        }
    }

    pub fn can_transition_to(&self, next: &AppointmentStatus) -> bool {
        self.valid_transitions().contains(next)
    }
}

// ==============================================================================
// WEEKLY SCHEDULE
// ==============================================================================

/// Weekday (0 = Sunday .. 6 = Saturday) to availability intervals. A weekday
/// absent from the map is fully blocked. Intervals are stored as entered:
/// neither sorted nor non-overlapping, overlaps just widen availability.
pub type WeeklySchedule = BTreeMap<u8, Vec<ScheduleInterval>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInterval {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(default = "all_types")]
    pub tipo: String,
}

fn all_types() -> String {
    "all".to_string()
}

impl ScheduleInterval {
    pub fn allows(&self, tipo: &str) -> bool {
        self.tipo == "all" || self.tipo == tipo
    }
}

/// Weekday index with Sunday = 0, matching the stored schedule keys.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

// ==============================================================================
// SCHEDULE BLOCKS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockRecurrence {
    #[default]
    None,
    Weekly,
    Monthly,
}

/// An exclusion carved out of availability: vacations, personal blocks,
/// holidays, or busy time imported from the external calendar (reason
/// prefixed with "Google: ").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: String,
    pub professional_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, with = "hhmm_option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_all_day: bool,
    pub reason: String,
    #[serde(default)]
    pub recurrence: BlockRecurrence,
}

impl ScheduleBlock {
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        if date >= self.start_date && date <= self.end_date {
            return true;
        }
        if date < self.start_date {
            return false;
        }
        match self.recurrence {
            BlockRecurrence::None => false,
            BlockRecurrence::Weekly => date.weekday() == self.start_date.weekday(),
            BlockRecurrence::Monthly => date.day() == self.start_date.day(),
        }
    }

    /// Whether this block removes the given slot from availability.
    pub fn blocks_slot(&self, date: NaiveDate, slot_start: NaiveTime, slot_end: NaiveTime) -> bool {
        if !self.covers_date(date) {
            return false;
        }
        if self.is_all_day {
            return true;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => slot_start < end && slot_end > start,
            // Time fields are only omitted on all-day blocks; a malformed
            // row blocks the whole day rather than silently vanishing.
            _ => true,
        }
    }
}

// ==============================================================================
// AGENDA SETTINGS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaSettings {
    pub id: String,
    pub professional_id: String,
    #[serde(default)]
    pub weekly_schedule: WeeklySchedule,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: i64,
    #[serde(default)]
    pub external_sync_enabled: bool,
    #[serde(default)]
    pub external_sync_types: Vec<String>,
    pub feed_token: String,
    #[serde(default)]
    pub feed_enabled: bool,
}

pub fn default_slot_duration() -> i64 {
    30
}

// ==============================================================================
// PROFESSIONAL (read-only collaborator record)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub weekly_schedule: Option<WeeklySchedule>,
    pub slot_duration_minutes: Option<i64>,
    pub external_sync_enabled: Option<bool>,
    pub external_sync_types: Option<Vec<String>>,
    pub feed_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub professional_id: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_all_day: bool,
    pub reason: String,
    #[serde(default)]
    pub recurrence: BlockRecurrence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AgendaError {
    #[error("Settings not found for professional")]
    SettingsNotFound,

    #[error("Schedule block not found")]
    BlockNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
