// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use agenda_cell::models::CLINIC_TZ;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{JobKind, JobTriggerRequest, NotificationError};
use crate::services::ReminderService;

fn map_notification_error(err: NotificationError) -> AppError {
    match err {
        NotificationError::Webhook(msg) => AppError::ExternalService(msg),
        NotificationError::Database(msg) => AppError::Database(msg),
    }
}

async fn run_job(
    state: Arc<AppConfig>,
    kind: JobKind,
    body: Option<Json<JobTriggerRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let today = Utc::now().with_timezone(&CLINIC_TZ).date_naive();

    let service = ReminderService::new(&state);
    let report = service
        .run(kind, today, request.professional_id.as_deref())
        .await
        .map_err(map_notification_error)?;

    Ok(Json(json!(report)))
}

/// Scheduled trigger, optionally scoped to one professional.
#[axum::debug_handler]
pub async fn run_reminders(
    State(state): State<Arc<AppConfig>>,
    body: Option<Json<JobTriggerRequest>>,
) -> Result<Json<Value>, AppError> {
    run_job(state, JobKind::Reminder, body).await
}

#[axum::debug_handler]
pub async fn run_followups(
    State(state): State<Arc<AppConfig>>,
    body: Option<Json<JobTriggerRequest>>,
) -> Result<Json<Value>, AppError> {
    run_job(state, JobKind::FollowUp, body).await
}
