use axum::{
    Router,
    routing::{get, post},
};

use super::handlers;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/v1/conversations", get(handlers::handle_list_conversations))
        .route("/v1/conversations/{id}", get(handlers::handle_get_conversation))
        .route("/v1/upload", post(handlers::handle_upload))
        .route("/v1/chat", post(handlers::handle_chat))
}
