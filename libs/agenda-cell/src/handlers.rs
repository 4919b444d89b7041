// libs/agenda-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AgendaError, CreateBlockRequest, UpdateSettingsRequest};
use crate::services::{AvailabilityService, BlockService};

#[derive(Debug, Deserialize)]
pub struct SlotsQueryParams {
    pub date: NaiveDate,
    pub tipo: Option<String>,
}

fn map_agenda_error(err: AgendaError) -> AppError {
    match err {
        AgendaError::SettingsNotFound => {
            AppError::NotFound("Agenda settings not found".to_string())
        }
        AgendaError::BlockNotFound => AppError::NotFound("Schedule block not found".to_string()),
        AgendaError::ValidationError(msg) => AppError::ValidationError(msg),
        AgendaError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_settings(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let settings = service
        .get_or_create_settings(&professional_id)
        .await
        .map_err(map_agenda_error)?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let settings = service
        .update_settings(&professional_id, request)
        .await
        .map_err(map_agenda_error)?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
    Query(params): Query<SlotsQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service
        .available_slots(&professional_id, params.date, params.tipo.as_deref())
        .await
        .map_err(map_agenda_error)?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": params.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn list_blocks(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BlockService::new(&state);
    let blocks = service
        .list_blocks(&professional_id)
        .await
        .map_err(map_agenda_error)?;

    Ok(Json(json!(blocks)))
}

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BlockService::new(&state);
    let block = service.create_block(request).await.map_err(map_agenda_error)?;

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BlockService::new(&state);
    service.delete_block(&block_id).await.map_err(map_agenda_error)?;

    Ok(Json(json!({ "deleted": block_id })))
}
