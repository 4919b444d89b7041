// libs/agenda-cell/src/services/blocks.rs
use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::EntityStore;

use crate::models::{AgendaError, CreateBlockRequest, ScheduleBlock};

pub struct BlockService {
    store: EntityStore,
}

impl BlockService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: EntityStore::new(config),
        }
    }

    pub async fn list_blocks(
        &self,
        professional_id: &str,
    ) -> Result<Vec<ScheduleBlock>, AgendaError> {
        let path = format!(
            "/rest/v1/schedule_blocks?professional_id=eq.{}",
            urlencoding::encode(professional_id)
        );
        let mut blocks: Vec<ScheduleBlock> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        blocks.sort_by_key(|b| (b.start_date, b.start_time));
        Ok(blocks)
    }

    pub async fn create_block(
        &self,
        request: CreateBlockRequest,
    ) -> Result<ScheduleBlock, AgendaError> {
        debug!("Creating schedule block for professional: {}", request.professional_id);

        let end_date = request.end_date.unwrap_or(request.start_date);
        if end_date < request.start_date {
            return Err(AgendaError::ValidationError(
                "End date must not precede start date".to_string(),
            ));
        }
        if request.reason.trim().is_empty() {
            return Err(AgendaError::ValidationError("Reason is required".to_string()));
        }

        if !request.is_all_day {
            match (request.start_time, request.end_time) {
                (Some(start), Some(end)) if start < end => {}
                (Some(_), Some(_)) => {
                    return Err(AgendaError::ValidationError(
                        "Start time must be before end time".to_string(),
                    ));
                }
                _ => {
                    return Err(AgendaError::ValidationError(
                        "Timed blocks require start and end times".to_string(),
                    ));
                }
            }
        }

        let body = json!({
            "professional_id": request.professional_id,
            "start_date": request.start_date,
            "end_date": end_date,
            "start_time": request.start_time.map(|t| t.format("%H:%M").to_string()),
            "end_time": request.end_time.map(|t| t.format("%H:%M").to_string()),
            "is_all_day": request.is_all_day,
            "reason": request.reason,
            "recurrence": request.recurrence
        });

        let created: Vec<ScheduleBlock> = self.store
            .request_with_headers(
                Method::POST,
                "/rest/v1/schedule_blocks",
                Some(body),
                Some(EntityStore::return_representation()),
            )
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AgendaError::DatabaseError("Failed to create block".to_string()))
    }

    pub async fn delete_block(&self, block_id: &str) -> Result<(), AgendaError> {
        debug!("Deleting schedule block: {}", block_id);

        let path = format!(
            "/rest/v1/schedule_blocks?id=eq.{}",
            urlencoding::encode(block_id)
        );
        self.store
            .execute(Method::DELETE, &path)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))
    }

    /// Probe for a block matching the importer's content key
    /// (professional, start date, start time, reason).
    pub async fn find_matching(
        &self,
        professional_id: &str,
        start_date: NaiveDate,
        start_time: Option<NaiveTime>,
        reason: &str,
    ) -> Result<Option<ScheduleBlock>, AgendaError> {
        let path = format!(
            "/rest/v1/schedule_blocks?professional_id=eq.{}&start_date=eq.{}&reason=eq.{}",
            urlencoding::encode(professional_id),
            start_date,
            urlencoding::encode(reason)
        );
        let candidates: Vec<ScheduleBlock> = self.store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AgendaError::DatabaseError(e.to_string()))?;

        Ok(candidates.into_iter().find(|b| b.start_time == start_time))
    }
}
