// libs/calendar-sync-cell/src/services/outbound.rs
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use agenda_cell::models::Agendamento;
use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{
    clinic_datetime, GoogleEventBody, GoogleEventTime, SyncError, SyncEventEnvelope,
    SyncEventType, SyncOutcome,
};
use crate::services::connector::CalendarConnector;
use crate::services::google::GoogleCalendarClient;

const CLINIC_TZ_NAME: &str = "America/Sao_Paulo";

/// Event-driven reconciler: mirrors appointment changes onto the external
/// calendar. Invoked once per store change event; each invocation makes at
/// most one remote call (plus the local id write-back on create).
pub struct CalendarSyncService {
    store: EntityStore,
    google: GoogleCalendarClient,
    connector: CalendarConnector,
}

impl CalendarSyncService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
            google: GoogleCalendarClient::new(config),
            connector: CalendarConnector::new(config),
        }
    }

    pub async fn handle_event(
        &self,
        envelope: SyncEventEnvelope,
    ) -> Result<SyncOutcome, SyncError> {
        match envelope.event.event_type {
            SyncEventType::Create => {
                let appointment = envelope.data.ok_or(SyncError::MissingPayload("create"))?;
                self.sync_create(&appointment).await
            }
            SyncEventType::Update => {
                let new_data = envelope.data.ok_or(SyncError::MissingPayload("update"))?;
                self.sync_update(&new_data, envelope.old_data.as_ref()).await
            }
            SyncEventType::Delete => {
                let old_data = envelope.old_data.ok_or(SyncError::MissingPayload("delete"))?;
                self.sync_delete(&old_data).await
            }
        }
    }

    async fn sync_create(&self, appointment: &Agendamento) -> Result<SyncOutcome, SyncError> {
        let Some(token) = self.connector.access_token(&appointment.professional_id).await? else {
            info!("No calendar token, skipping sync for appointment {}", appointment.id);
            return Ok(SyncOutcome::Skipped { reason: "no access token".to_string() });
        };

        let body = build_event_body(appointment);
        let created = self.google.insert_event(&token, &body).await?;

        self.write_back_event_id(&appointment.id, &created.id).await?;

        info!("Appointment {} synced as remote event {}", appointment.id, created.id);
        Ok(SyncOutcome::Created { external_event_id: created.id })
    }

    async fn sync_update(
        &self,
        new_data: &Agendamento,
        old_data: Option<&Agendamento>,
    ) -> Result<SyncOutcome, SyncError> {
        // Loop prevention: the write-back of external_event_id fires another
        // update event whose tracked fields are identical, which stops here.
        if let Some(old) = old_data {
            if !tracked_fields_changed(old, new_data) {
                debug!("No tracked field changed for appointment {}, skipping", new_data.id);
                return Ok(SyncOutcome::Skipped { reason: "no tracked field changed".to_string() });
            }
        }

        let Some(token) = self.connector.access_token(&new_data.professional_id).await? else {
            info!("No calendar token, skipping sync for appointment {}", new_data.id);
            return Ok(SyncOutcome::Skipped { reason: "no access token".to_string() });
        };

        let event_id = new_data
            .external_event_id
            .clone()
            .or_else(|| old_data.and_then(|old| old.external_event_id.clone()));

        let body = build_event_body(new_data);

        match event_id {
            // Never synced before: repair by creating the remote event now.
            None => {
                warn!("Appointment {} has no remote event, creating one", new_data.id);
                let created = self.google.insert_event(&token, &body).await?;
                self.write_back_event_id(&new_data.id, &created.id).await?;
                Ok(SyncOutcome::Created { external_event_id: created.id })
            }
            Some(event_id) => {
                self.google.patch_event(&token, &event_id, &body).await?;
                info!("Appointment {} patched on remote event {}", new_data.id, event_id);
                Ok(SyncOutcome::Updated)
            }
        }
    }

    async fn sync_delete(&self, old_data: &Agendamento) -> Result<SyncOutcome, SyncError> {
        let Some(event_id) = old_data.external_event_id.as_deref() else {
            debug!("Appointment {} was never synced, nothing to delete", old_data.id);
            return Ok(SyncOutcome::Skipped { reason: "no remote event".to_string() });
        };

        let Some(token) = self.connector.access_token(&old_data.professional_id).await? else {
            info!("No calendar token, skipping delete for appointment {}", old_data.id);
            return Ok(SyncOutcome::Skipped { reason: "no access token".to_string() });
        };

        self.google.delete_event(&token, event_id).await?;

        info!("Remote event {} deleted for appointment {}", event_id, old_data.id);
        Ok(SyncOutcome::Deleted)
    }

    async fn write_back_event_id(
        &self,
        appointment_id: &str,
        event_id: &str,
    ) -> Result<(), SyncError> {
        let path = format!(
            "/rest/v1/agendamentos?id=eq.{}",
            urlencoding::encode(appointment_id)
        );
        let _: Vec<serde_json::Value> = self.store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "external_event_id": event_id })),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(())
    }
}

/// The field set whose changes are pushed to the external calendar. Changes
/// to anything else (sent-flags, external_event_id, check-in metadata) must
/// not produce remote calls.
pub fn tracked_fields_changed(old: &Agendamento, new: &Agendamento) -> bool {
    old.patient_name != new.patient_name
        || old.date != new.date
        || old.start_time != new.start_time
        || old.end_time != new.end_time
        || old.observations != new.observations
        || old.status != new.status
}

pub fn build_event_body(appointment: &Agendamento) -> GoogleEventBody {
    let mut description = format!(
        "Tipo: {}\nStatus: {}",
        appointment.tipo, appointment.status
    );
    if let Some(obs) = appointment.observations.as_deref() {
        if !obs.is_empty() {
            description.push('\n');
            description.push_str(obs);
        }
    }

    let start = clinic_datetime(appointment.date, appointment.start_time);
    let end = clinic_datetime(appointment.date, appointment.effective_end_time());

    GoogleEventBody {
        summary: format!("Consulta: {}", appointment.patient_name),
        description,
        start: GoogleEventTime {
            date_time: Some(start.to_rfc3339()),
            date: None,
            time_zone: Some(CLINIC_TZ_NAME.to_string()),
        },
        end: GoogleEventTime {
            date_time: Some(end.to_rfc3339()),
            date: None,
            time_zone: Some(CLINIC_TZ_NAME.to_string()),
        },
    }
}
