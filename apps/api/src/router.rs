use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use agenda_cell::router::agenda_routes;
use calendar_sync_cell::router::{feed_routes, sync_routes};
use notification_cell::router::notification_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Consultorio Agenda API is running!" }))
        .nest("/agenda", agenda_routes(state.clone()))
        .nest("/jobs", notification_routes(state.clone()))
        .nest("/sync", sync_routes(state.clone()))
        .nest("/feed", feed_routes(state))
}
