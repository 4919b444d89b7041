// libs/agenda-cell/src/services/availability.rs
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{
    Agendamento, AgendaError, AgendaSettings, AvailableSlot, ScheduleBlock,
    UpdateSettingsRequest, default_slot_duration, weekday_index,
};

pub struct AvailabilityService {
    store: EntityStore,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
        }
    }

    /// Fetch the professional's agenda settings, creating the default row on
    /// first access.
    pub async fn get_or_create_settings(
        &self,
        professional_id: &str,
    ) -> Result<AgendaSettings, AgendaError> {
        debug!("Fetching agenda settings for professional: {}", professional_id);

        let path = format!(
            "/rest/v1/agenda_settings?professional_id=eq.{}",
            urlencoding::encode(professional_id)
        );
        let existing: Vec<AgendaSettings> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        if let Some(settings) = existing.into_iter().next() {
            return Ok(settings);
        }

        debug!("No settings row yet, creating defaults");

        let defaults = json!({
            "professional_id": professional_id,
            "weekly_schedule": {},
            "slot_duration_minutes": default_slot_duration(),
            "external_sync_enabled": false,
            "external_sync_types": [],
            "feed_token": Uuid::new_v4().to_string(),
            "feed_enabled": false
        });

        let created: Vec<AgendaSettings> = self.store
            .request_with_headers(
                Method::POST,
                "/rest/v1/agenda_settings",
                Some(defaults),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AgendaError::DatabaseError("Failed to create settings".to_string()))
    }

    pub async fn update_settings(
        &self,
        professional_id: &str,
        request: UpdateSettingsRequest,
    ) -> Result<AgendaSettings, AgendaError> {
        debug!("Updating agenda settings for professional: {}", professional_id);

        if let Some(duration) = request.slot_duration_minutes {
            if duration < 5 || duration > 240 {
                return Err(AgendaError::ValidationError(
                    "Slot duration must be between 5 and 240 minutes".to_string(),
                ));
            }
        }
        if let Some(ref schedule) = request.weekly_schedule {
            for (day, intervals) in schedule {
                if *day > 6 {
                    return Err(AgendaError::ValidationError(
                        "Weekday must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                    ));
                }
                for interval in intervals {
                    if interval.start >= interval.end {
                        return Err(AgendaError::ValidationError(
                            "Interval start must be before end".to_string(),
                        ));
                    }
                }
            }
        }

        // Make sure the row exists before patching it.
        self.get_or_create_settings(professional_id).await?;

        let mut patch = serde_json::Map::new();
        if let Some(schedule) = request.weekly_schedule {
            patch.insert("weekly_schedule".to_string(), json!(schedule));
        }
        if let Some(duration) = request.slot_duration_minutes {
            patch.insert("slot_duration_minutes".to_string(), json!(duration));
        }
        if let Some(enabled) = request.external_sync_enabled {
            patch.insert("external_sync_enabled".to_string(), json!(enabled));
        }
        if let Some(types) = request.external_sync_types {
            patch.insert("external_sync_types".to_string(), json!(types));
        }
        if let Some(enabled) = request.feed_enabled {
            patch.insert("feed_enabled".to_string(), json!(enabled));
        }

        let path = format!(
            "/rest/v1/agenda_settings?professional_id=eq.{}",
            urlencoding::encode(professional_id)
        );
        let updated: Vec<AgendaSettings> = self.store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(patch)),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        updated.into_iter().next().ok_or(AgendaError::SettingsNotFound)
    }

    /// Compute bookable slots for one professional and date: expand the
    /// weekday's intervals by the slot duration, then drop slots taken by
    /// appointments or removed by schedule blocks.
    pub async fn available_slots(
        &self,
        professional_id: &str,
        date: NaiveDate,
        tipo: Option<&str>,
    ) -> Result<Vec<AvailableSlot>, AgendaError> {
        debug!("Calculating available slots for professional {} on {}", professional_id, date);

        let settings = self.get_or_create_settings(professional_id).await?;

        let day = weekday_index(date);
        let intervals = match settings.weekly_schedule.get(&day) {
            Some(intervals) => intervals.clone(),
            None => return Ok(vec![]),
        };

        let appointments = self.appointments_for_date(professional_id, date).await?;
        let blocks = self.blocks_for_professional(professional_id).await?;

        let slot_minutes = settings.slot_duration_minutes.max(5);
        let mut slots = Vec::new();

        for interval in intervals {
            if let Some(tipo) = tipo {
                if !interval.allows(tipo) {
                    continue;
                }
            }

            let mut current = interval.start;
            while current + Duration::minutes(slot_minutes) <= interval.end {
                let slot_end = current + Duration::minutes(slot_minutes);

                let taken = appointments.iter().any(|apt| {
                    apt.occupies_slot()
                        && current < apt.effective_end_time()
                        && slot_end > apt.start_time
                });
                let blocked = blocks.iter().any(|b| b.blocks_slot(date, current, slot_end));

                if !taken && !blocked {
                    slots.push(AvailableSlot {
                        date,
                        start_time: current,
                        end_time: slot_end,
                    });
                }

                current = slot_end;
            }
        }

        // Overlapping intervals produce duplicate windows; keep one slot per
        // start time.
        slots.sort_by_key(|s| s.start_time);
        slots.dedup_by_key(|s| s.start_time);

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    async fn appointments_for_date(
        &self,
        professional_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Agendamento>, AgendaError> {
        let path = format!(
            "/rest/v1/agendamentos?professional_id=eq.{}&date=eq.{}",
            urlencoding::encode(professional_id),
            date
        );
        self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))
    }

    async fn blocks_for_professional(
        &self,
        professional_id: &str,
    ) -> Result<Vec<ScheduleBlock>, AgendaError> {
        let path = format!(
            "/rest/v1/schedule_blocks?professional_id=eq.{}",
            urlencoding::encode(professional_id)
        );
        self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))
    }
}
