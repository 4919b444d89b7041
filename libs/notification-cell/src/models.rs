// libs/notification-cell/src/models.rs
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use agenda_cell::models::{Agendamento, AppointmentStatus};

/// The two batch jobs: reminders the day before, follow-ups the day after.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Reminder,
    FollowUp,
}

impl JobKind {
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            JobKind::Reminder => today + Duration::days(1),
            JobKind::FollowUp => today - Duration::days(1),
        }
    }

    pub fn status_filter(&self) -> AppointmentStatus {
        match self {
            JobKind::Reminder => AppointmentStatus::Agendado,
            JobKind::FollowUp => AppointmentStatus::Realizado,
        }
    }

    pub fn flag_field(&self) -> &'static str {
        match self {
            JobKind::Reminder => "reminder_sent",
            JobKind::FollowUp => "followup_sent",
        }
    }

    pub fn render_message(&self, appointment: &Agendamento) -> String {
        match self {
            JobKind::Reminder => format!(
                "Olá {}, lembrete da sua consulta amanhã às {}. Em caso de imprevisto, por favor avise com antecedência.",
                appointment.patient_name,
                appointment.start_time.format("%H:%M"),
            ),
            JobKind::FollowUp => format!(
                "Olá {}, esperamos que sua consulta tenha corrido bem. Qualquer dúvida sobre as orientações, estamos à disposição.",
                appointment.patient_name,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItemResult {
    pub appointment_id: String,
    pub patient_name: String,
    pub outcome: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-run report: dispatch failures stay inside `items`, they never abort
/// the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: JobKind,
    pub target_date: NaiveDate,
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub items: Vec<JobItemResult>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobTriggerRequest {
    pub professional_id: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Database error: {0}")]
    Database(String),
}
