// libs/calendar-sync-cell/src/services/importer.rs
use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use agenda_cell::models::{Agendamento, AgendaSettings, CLINIC_TZ};
use agenda_cell::services::{AvailabilityService, BlockService};
use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{GoogleEvent, ImportItemResult, ImportReport, SyncError};
use crate::services::connector::CalendarConnector;
use crate::services::google::GoogleCalendarClient;

const IMPORT_WINDOW_DAYS: i64 = 30;

/// Pull-based reconciler: fetches remote busy time in a rolling window and
/// materializes events we do not already track as schedule blocks.
pub struct CalendarImportService {
    store: EntityStore,
    google: GoogleCalendarClient,
    connector: CalendarConnector,
    availability: AvailabilityService,
    blocks: BlockService,
}

/// Remote event translated into clinic-local block coordinates.
struct BlockTimes {
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    is_all_day: bool,
}

impl CalendarImportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
            google: GoogleCalendarClient::new(config),
            connector: CalendarConnector::new(config),
            availability: AvailabilityService::new(config),
            blocks: BlockService::new(config),
        }
    }

    /// Import for one professional. Disabled sync or a missing token count
    /// as zero blocks created, not as an error.
    pub async fn import_professional(&self, professional_id: &str) -> Result<u32, SyncError> {
        let settings = self.availability
            .get_or_create_settings(professional_id)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        if !settings.external_sync_enabled {
            debug!("External sync disabled for professional {}", professional_id);
            return Ok(0);
        }

        let Some(token) = self.connector.access_token(professional_id).await? else {
            info!("No calendar token for professional {}, skipping import", professional_id);
            return Ok(0);
        };

        let window_start = Utc::now();
        let window_end = window_start + Duration::days(IMPORT_WINDOW_DAYS);

        let events = self.google.list_events(&token, window_start, window_end).await?;
        debug!("Fetched {} remote events for professional {}", events.len(), professional_id);

        let known_ids = self
            .known_event_ids(
                professional_id,
                window_start.with_timezone(&CLINIC_TZ).date_naive(),
                window_end.with_timezone(&CLINIC_TZ).date_naive(),
            )
            .await?;

        let mut created = 0u32;

        for event in events {
            if known_ids.contains(&event.id) {
                continue;
            }
            if event.is_transparent() {
                debug!("Remote event {} is transparent, not imported", event.id);
                continue;
            }

            let Some(times) = block_times(&event) else {
                warn!("Remote event {} has unparseable times, skipped", event.id);
                continue;
            };

            let summary = event
                .summary
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Ocupado");
            let reason = format!("Google: {}", summary);

            // Content-based dedup: one block per professional, start date,
            // start time and reason. A renamed remote event therefore lands
            // as a new block instead of updating the old one.
            let duplicate = self.blocks
                .find_matching(professional_id, times.start_date, times.start_time, &reason)
                .await
                .map_err(|e| SyncError::Database(e.to_string()))?;
            if duplicate.is_some() {
                continue;
            }

            self.create_block(professional_id, &times, &reason).await?;
            created += 1;
        }

        info!("Imported {} blocks for professional {}", created, professional_id);
        Ok(created)
    }

    /// Import for every professional with sync enabled. One professional's
    /// failure zeroes their contribution without stopping the others.
    pub async fn import_all(&self) -> Result<ImportReport, SyncError> {
        let enabled: Vec<AgendaSettings> = self.store
            .request(
                Method::GET,
                "/rest/v1/agenda_settings?external_sync_enabled=eq.true",
                None,
            )
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        let mut results = Vec::new();
        let mut total_created = 0u32;

        for settings in enabled {
            match self.import_professional(&settings.professional_id).await {
                Ok(created) => {
                    total_created += created;
                    results.push(ImportItemResult {
                        professional_id: settings.professional_id,
                        created,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Import failed for professional {}: {}", settings.professional_id, e);
                    results.push(ImportItemResult {
                        professional_id: settings.professional_id,
                        created: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(ImportReport { total_created, results })
    }

    /// Remote ids already represented by local appointments, restricted to
    /// the import window so the scan stays bounded.
    async fn known_event_ids(
        &self,
        professional_id: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<HashSet<String>, SyncError> {
        let path = format!(
            "/rest/v1/agendamentos?professional_id=eq.{}",
            urlencoding::encode(professional_id)
        );
        let appointments: Vec<Agendamento> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(appointments
            .into_iter()
            .filter(|apt| apt.date >= window_start && apt.date <= window_end)
            .filter_map(|apt| apt.external_event_id)
            .collect())
    }

    async fn create_block(
        &self,
        professional_id: &str,
        times: &BlockTimes,
        reason: &str,
    ) -> Result<(), SyncError> {
        let body = json!({
            "professional_id": professional_id,
            "start_date": times.start_date,
            "end_date": times.end_date,
            "start_time": times.start_time.map(|t| t.format("%H:%M").to_string()),
            "end_time": times.end_time.map(|t| t.format("%H:%M").to_string()),
            "is_all_day": times.is_all_day,
            "reason": reason,
            "recurrence": "none"
        });

        let _: Vec<serde_json::Value> = self.store
            .request_with_headers(
                Method::POST,
                "/rest/v1/schedule_blocks",
                Some(body),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Translate a remote event into clinic-local block coordinates. All-day
/// events carry date-only bounds with an exclusive end; timed events are
/// converted from their own offset into the practice timezone.
fn block_times(event: &GoogleEvent) -> Option<BlockTimes> {
    if event.is_all_day() {
        let start_date = NaiveDate::parse_from_str(event.start.date.as_deref()?, "%Y-%m-%d").ok()?;
        let end_date = event
            .end
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d - Duration::days(1))
            .filter(|d| *d >= start_date)
            .unwrap_or(start_date);

        return Some(BlockTimes {
            start_date,
            end_date,
            start_time: None,
            end_time: None,
            is_all_day: true,
        });
    }

    let start = parse_clinic_local(event.start.date_time.as_deref()?)?;
    let end = event
        .end
        .date_time
        .as_deref()
        .and_then(parse_clinic_local)
        .unwrap_or(start + Duration::minutes(30));

    Some(BlockTimes {
        start_date: start.date_naive(),
        end_date: end.date_naive(),
        start_time: Some(truncate_to_minute(start.time())),
        end_time: Some(truncate_to_minute(end.time())),
        is_all_day: false,
    })
}

/// Blocks are stored with minute precision; second-level remote times must
/// be truncated or the content dedup key would never match.
fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn parse_clinic_local(value: &str) -> Option<chrono::DateTime<chrono_tz::Tz>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&CLINIC_TZ))
}
