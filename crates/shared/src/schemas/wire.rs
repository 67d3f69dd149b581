// crates/shared/src/schemas/wire.rs
//
// Shapes as they travel over HTTP. Backends disagree on casing and on how
// images are encoded, so everything here accepts both spellings and is
// folded into the canonical types on the way in.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ConversationSummary, Role, RouteMode};

/// An image reference as sent by a backend: either a bare URL or an
/// uploaded-image object.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireImage {
    Url(String),
    Uploaded {
        #[serde(rename = "storageUrl", alias = "storage_url")]
        storage_url: String,
        #[serde(rename = "previewUrl", alias = "preview_url", default)]
        preview_url: Option<String>,
    },
}

impl WireImage {
    pub fn into_display_url(self) -> String {
        match self {
            WireImage::Url(url) => url,
            WireImage::Uploaded { storage_url, preview_url } => preview_url.unwrap_or(storage_url),
        }
    }
}

#[derive(Deserialize)]
pub struct WireMessage {
    id: String,
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Option<Vec<WireImage>>,
    #[serde(rename = "createdAt", alias = "created_at")]
    created_at: DateTime<Utc>,
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        ChatMessage {
            id: wire.id,
            role: wire.role,
            content: wire.content.unwrap_or_default(),
            images: wire
                .images
                .unwrap_or_default()
                .into_iter()
                .map(WireImage::into_display_url)
                .collect(),
            created_at: wire.created_at,
        }
    }
}

// GET /v1/conversations
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListConversationsResponse {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

// GET /v1/conversations/{id}
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConversationHistory {
    #[serde(rename = "conversationId", alias = "conversation_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

// POST /v1/chat
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatRequest {
    #[serde(alias = "conversationId", default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub route: RouteMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendResult {
    // Some backends omit the id; the client falls back to the one it sent.
    #[serde(rename = "conversationId", alias = "conversation_id", default)]
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

// POST /v1/upload
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UploadResponse {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorBody {
    pub error: String,
}
