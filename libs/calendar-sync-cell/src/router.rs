// libs/calendar-sync-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

/// Change-event handler plus the import job trigger, nested under `/sync`.
pub fn sync_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/agendamentos", post(handlers::sync_agendamento))
        .route("/import", post(handlers::run_calendar_import))
        .with_state(state)
}

/// Read-only calendar feed, nested under `/feed`.
pub fn feed_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{token}", get(handlers::get_feed))
        .with_state(state)
}
