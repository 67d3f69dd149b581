use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
};
use prismchat_shared::schemas::{
    ChatRequest, ConversationHistory, ListConversationsResponse, SendResult, UploadResponse,
};
use prismchat_shared::{ChatMessage, RouteMode};

use crate::error::{ApiError, ApiResult};
use crate::redaction::IncomingFile;
use crate::state::AppState;

use super::types::*;

/// Multipart field carrying the images.
pub const UPLOAD_FIELD: &str = "files";

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn handle_list_conversations(
    State(state): State<AppState>,
) -> Json<ListConversationsResponse> {
    Json(ListConversationsResponse {
        conversations: state.store.list_conversations(),
    })
}

pub async fn handle_get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationHistory>> {
    let messages = state
        .store
        .get_conversation(&id)
        .ok_or_else(|| ApiError::NotFound { id: id.clone() })?;

    Ok(Json(ConversationHistory {
        conversation_id: id,
        messages,
    }))
}

pub async fn handle_upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut form: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let route = query.route.unwrap_or_default();
    let mut files = Vec::new();

    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| ApiError::UploadForm { details: e.body_text() })?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::UploadForm { details: e.body_text() })?;

        files.push(IncomingFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Ok(Json(UploadResponse::default()));
    }

    let count = files.len();
    let urls = state.uploads.store_batch(files, route).await?;
    tracing::info!(count, %route, redactor = state.uploads.redactor_name(), "stored uploads");

    Ok(Json(UploadResponse { urls }))
}

pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<SendResult>> {
    let req: ChatRequest = serde_json::from_slice(&body).map_err(|e| ApiError::Validation {
        details: e.to_string(),
    })?;

    let text = req.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() && req.images.is_empty() {
        return Err(ApiError::Validation {
            details: "a message needs text or at least one image".to_string(),
        });
    }
    if req.images.iter().any(|url| url.trim().is_empty()) {
        return Err(ApiError::Validation {
            details: "image URLs must not be empty".to_string(),
        });
    }

    let requested_id = req
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let conversation_id = state.store.ensure_conversation(requested_id);

    let user_message = ChatMessage::user(text, req.images.clone());
    let reply = ChatMessage::assistant(assistant_reply(req.route));

    let messages = state
        .store
        .append_turn(&conversation_id, user_message, reply)
        .ok_or_else(|| ApiError::NotFound {
            id: conversation_id.clone(),
        })?;

    tracing::info!(
        conversation_id = %conversation_id,
        route = %req.route,
        images = req.images.len(),
        total = messages.len(),
        "chat turn stored"
    );

    Ok(Json(SendResult {
        conversation_id,
        messages,
    }))
}

/// Canned assistant turn for the mock backend.
pub fn assistant_reply(route: RouteMode) -> &'static str {
    match route {
        RouteMode::Prismguard => "🔒 (PrismGuard) Your data is protected. How can I help?",
        RouteMode::Direct => "👋 (Direct) How can I help you today?",
    }
}
