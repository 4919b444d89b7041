// libs/notification-cell/src/services/reminder.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info};

use agenda_cell::models::Agendamento;
use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{ItemOutcome, JobItemResult, JobKind, JobReport, NotificationError};
use crate::services::notifier::NotificationSender;

pub struct ReminderService {
    store: EntityStore,
    sender: NotificationSender,
}

impl ReminderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
            sender: NotificationSender::new(config),
        }
    }

    /// One batch run. Scans appointments on the job's target date whose
    /// sent-flag is still false, claims each flag with a conditional update,
    /// then dispatches the message. A failed dispatch is recorded per item
    /// and never aborts the rest of the batch.
    pub async fn run(
        &self,
        kind: JobKind,
        today: NaiveDate,
        professional_id: Option<&str>,
    ) -> Result<JobReport, NotificationError> {
        let target_date = kind.target_date(today);
        info!("Running {:?} job for {}", kind, target_date);

        let mut path = format!(
            "/rest/v1/agendamentos?date=eq.{}&status=eq.{}&{}=eq.false",
            target_date,
            kind.status_filter(),
            kind.flag_field()
        );
        if let Some(id) = professional_id {
            path.push_str(&format!("&professional_id=eq.{}", urlencoding::encode(id)));
        }

        let appointments: Vec<Agendamento> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        debug!("{} appointments match the {:?} query", appointments.len(), kind);

        let mut items = Vec::new();

        for appointment in appointments {
            let phone = match appointment.phone.as_deref() {
                Some(phone) if !phone.trim().is_empty() => phone,
                // No contact number: skipped, not a failure.
                _ => {
                    debug!("Appointment {} has no phone, skipping", appointment.id);
                    continue;
                }
            };

            if !self.claim_flag(&appointment.id, kind.flag_field()).await? {
                debug!("Appointment {} already claimed by a concurrent run", appointment.id);
                continue;
            }

            let message = kind.render_message(&appointment);
            match self.sender.send(phone, &message).await {
                Ok(()) => {
                    items.push(JobItemResult {
                        appointment_id: appointment.id,
                        patient_name: appointment.patient_name,
                        outcome: ItemOutcome::Sent,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Dispatch failed for appointment {}: {}", appointment.id, e);
                    items.push(JobItemResult {
                        appointment_id: appointment.id,
                        patient_name: appointment.patient_name,
                        outcome: ItemOutcome::Failed,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let sent = items.iter().filter(|i| i.outcome == ItemOutcome::Sent).count();
        let failed = items.len() - sent;
        info!("{:?} job finished: {} sent, {} failed", kind, sent, failed);

        Ok(JobReport {
            job: kind,
            target_date,
            processed: items.len(),
            sent,
            failed,
            items,
        })
    }

    /// Conditional flip of the sent-flag: only the run that actually turns
    /// false into true gets to dispatch, so two overlapping runs cannot both
    /// send for the same appointment.
    async fn claim_flag(&self, appointment_id: &str, flag: &str) -> Result<bool, NotificationError> {
        let path = format!(
            "/rest/v1/agendamentos?id=eq.{}&{}=eq.false",
            urlencoding::encode(appointment_id),
            flag
        );
        let updated: Vec<serde_json::Value> = self.store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ flag: true })),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        Ok(!updated.is_empty())
    }
}
