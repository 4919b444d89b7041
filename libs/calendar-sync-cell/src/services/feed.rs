// libs/calendar-sync-cell/src/services/feed.rs
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use tracing::debug;

use agenda_cell::models::{Agendamento, AgendaSettings, AppointmentStatus, Professional, ScheduleBlock};
use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{clinic_datetime_utc, FeedError};

/// Read-only projection of a professional's agenda into an iCalendar
/// document for external subscription. Never mutates anything.
pub struct FeedService {
    store: EntityStore,
}

impl FeedService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
        }
    }

    pub async fn render_feed(&self, token: &str) -> Result<String, FeedError> {
        debug!("Rendering calendar feed");

        let path = format!(
            "/rest/v1/agenda_settings?feed_token=eq.{}&feed_enabled=eq.true",
            urlencoding::encode(token)
        );
        let settings: Vec<AgendaSettings> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;

        let settings = settings.into_iter().next().ok_or(FeedError::NotFound)?;

        let path = format!(
            "/rest/v1/professionals?id=eq.{}",
            urlencoding::encode(&settings.professional_id)
        );
        let professionals: Vec<Professional> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;

        let professional = professionals.into_iter().next().ok_or(FeedError::NotFound)?;

        let path = format!(
            "/rest/v1/agendamentos?professional_id=eq.{}",
            urlencoding::encode(&professional.id)
        );
        let appointments: Vec<Agendamento> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;

        let path = format!(
            "/rest/v1/schedule_blocks?professional_id=eq.{}",
            urlencoding::encode(&professional.id)
        );
        let blocks: Vec<ScheduleBlock> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;

        Ok(build_calendar(&professional, &appointments, &blocks, Utc::now()))
    }
}

/// Assemble the iCalendar document: one VEVENT per non-cancelled
/// appointment, one opaque VEVENT per schedule block.
pub fn build_calendar(
    professional: &Professional,
    appointments: &[Agendamento],
    blocks: &[ScheduleBlock],
    now: DateTime<Utc>,
) -> String {
    let dtstamp = format_utc(now);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Consultorio Digital//Agenda//PT".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:Agenda - {}", escape_text(&professional.full_name)),
        "X-WR-TIMEZONE:America/Sao_Paulo".to_string(),
    ];

    for appointment in appointments {
        if appointment.status == AppointmentStatus::Cancelado {
            continue;
        }

        let start = clinic_datetime_utc(appointment.date, appointment.start_time);
        let mut end = clinic_datetime_utc(appointment.date, appointment.effective_end_time());
        if end <= start {
            end = start + Duration::minutes(30);
        }

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:agendamento-{}@consultorio", appointment.id));
        lines.push(format!("DTSTAMP:{}", dtstamp));
        lines.push(format!("DTSTART:{}", format_utc(start)));
        lines.push(format!("DTEND:{}", format_utc(end)));
        lines.push(format!(
            "SUMMARY:Consulta: {}",
            escape_text(&appointment.patient_name)
        ));
        lines.push(format!(
            "DESCRIPTION:Tipo: {}\\nStatus: {}",
            escape_text(&appointment.tipo),
            appointment.status
        ));
        lines.push("END:VEVENT".to_string());
    }

    for block in blocks {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:block-{}@consultorio", block.id));
        lines.push(format!("DTSTAMP:{}", dtstamp));

        if block.is_all_day {
            // All-day events use date values with an exclusive end.
            let end = block.end_date + Duration::days(1);
            lines.push(format!("DTSTART;VALUE=DATE:{}", block.start_date.format("%Y%m%d")));
            lines.push(format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")));
        } else {
            let start_time = block.start_time.unwrap_or_default();
            let end_time = block.end_time.unwrap_or(start_time);
            let start = clinic_datetime_utc(block.start_date, start_time);
            let end = clinic_datetime_utc(block.end_date, end_time);
            lines.push(format!("DTSTART:{}", format_utc(start)));
            lines.push(format!("DTEND:{}", format_utc(end.max(start))));
        }

        lines.push(format!("SUMMARY:{}", escape_text(&block.reason)));
        lines.push("TRANSP:OPAQUE".to_string());
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    let mut document = lines.join("\r\n");
    document.push_str("\r\n");
    document
}

fn format_utc(value: DateTime<Utc>) -> String {
    value.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escape TEXT values per RFC 5545 §3.3.11.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
