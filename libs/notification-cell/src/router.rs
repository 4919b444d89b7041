// libs/notification-cell/src/router.rs
use std::sync::Arc;

use axum::{Router, routing::post};

use shared_config::AppConfig;

use crate::handlers;

pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/reminders", post(handlers::run_reminders))
        .route("/followups", post(handlers::run_followups))
        .with_state(state)
}
