pub mod schemas;

pub use schemas::{
    ChatMessage, ConversationSummary, Role, RouteMode, UploadedImage, DEFAULT_CONVERSATION_TITLE,
    truncate_chars,
};
