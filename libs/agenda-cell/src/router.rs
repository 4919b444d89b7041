// libs/agenda-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn agenda_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/professionals/{professional_id}/settings", get(handlers::get_settings))
        .route("/professionals/{professional_id}/settings", put(handlers::update_settings))
        .route("/professionals/{professional_id}/slots", get(handlers::get_available_slots))
        .route("/professionals/{professional_id}/blocks", get(handlers::list_blocks))
        .route("/blocks", post(handlers::create_block))
        .route("/blocks/{block_id}", delete(handlers::delete_block))
        .with_state(state)
}
