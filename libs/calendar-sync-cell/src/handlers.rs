// libs/calendar-sync-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{FeedError, ImportTriggerRequest, SyncError, SyncEventEnvelope};
use crate::services::{CalendarImportService, CalendarSyncService, FeedService};

fn map_sync_error(err: SyncError) -> AppError {
    match err {
        SyncError::MissingPayload(event) => {
            AppError::BadRequest(format!("Missing appointment payload in {} event", event))
        }
        SyncError::Api { status, message } => {
            AppError::ExternalService(format!("Calendar API error ({}): {}", status, message))
        }
        SyncError::TokenEndpoint(msg) => AppError::ExternalService(msg),
        SyncError::Database(msg) => AppError::Database(msg),
    }
}

/// Store change events for appointments land here.
#[axum::debug_handler]
pub async fn sync_agendamento(
    State(state): State<Arc<AppConfig>>,
    Json(envelope): Json<SyncEventEnvelope>,
) -> Result<Json<Value>, AppError> {
    let service = CalendarSyncService::new(&state);
    let outcome = service.handle_event(envelope).await.map_err(map_sync_error)?;

    Ok(Json(json!({ "outcome": outcome })))
}

/// Scheduled trigger, or targeted at one professional via the body.
#[axum::debug_handler]
pub async fn run_calendar_import(
    State(state): State<Arc<AppConfig>>,
    body: Option<Json<ImportTriggerRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let service = CalendarImportService::new(&state);

    match request.professional_id {
        Some(professional_id) => {
            let created = service
                .import_professional(&professional_id)
                .await
                .map_err(map_sync_error)?;
            Ok(Json(json!({
                "professional_id": professional_id,
                "created": created
            })))
        }
        None => {
            let report = service.import_all().await.map_err(map_sync_error)?;
            Ok(Json(json!(report)))
        }
    }
}

/// Calendar feed for external subscription. Errors are plain text, not the
/// JSON envelope: feed readers show the body as-is.
#[axum::debug_handler]
pub async fn get_feed(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let token = token.strip_suffix(".ics").unwrap_or(&token);

    let service = FeedService::new(&state);
    let document = service.render_feed(token).await.map_err(|e| match e {
        FeedError::NotFound => (StatusCode::NOT_FOUND, "Feed not found".to_string()),
        FeedError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
        document,
    )
        .into_response())
}
