// crates/shared/src/schemas/mod.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod wire;

pub use wire::{
    ChatRequest, ConversationHistory, ErrorBody, ListConversationsResponse, SendResult,
    UploadResponse, WireImage,
};

pub const DEFAULT_CONVERSATION_TITLE: &str = "New chat";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How the backend treats a sent message and its images.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    #[default]
    Direct,
    Prismguard,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Direct => "direct",
            RouteMode::Prismguard => "prismguard",
        }
    }

    /// Whether uploads on this route go through server-side redaction.
    pub fn redacts(&self) -> bool {
        matches!(self, RouteMode::Prismguard)
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(RouteMode::Direct),
            "prismguard" => Ok(RouteMode::Prismguard),
            other => Err(format!("unknown route '{}', expected 'direct' or 'prismguard'", other)),
        }
    }
}

/// Canonical in-memory message. Wire skew is resolved in [`wire`] before
/// anything reaches this type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(from = "wire::WireMessage")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub images: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            images,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>, images: Vec<String>) -> Self {
        Self::new(Role::User, content, images)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Vec::new())
    }

    /// True when there is neither text nor an image to show.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() && self.images.is_empty()
    }
}

/// Sidebar entry for a conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "createdAt", alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

/// Result of persisting one local file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    #[serde(rename = "storageUrl", alias = "storage_url")]
    pub storage_url: String,
    #[serde(rename = "previewUrl", alias = "preview_url", default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl UploadedImage {
    /// URL to render for the sender: the local preview when one exists.
    pub fn display_url(&self) -> &str {
        self.preview_url.as_deref().unwrap_or(&self.storage_url)
    }
}

/// First `max` characters of `text`, counted in chars rather than bytes.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
