use prismchat_shared::schemas::SendResult;
use prismchat_shared::{ChatMessage, ConversationSummary, UploadedImage};

use crate::client::{ApiClient, SendPayload};
use crate::error::ClientResult;
use crate::files::LocalFile;

pub use futures_util::future::BoxFuture;

/// The backend as seen by the controller. [`ApiClient`] is the real
/// implementation; tests swap in their own.
pub trait ChatApi: Send + Sync {
    fn list_conversations(&self) -> BoxFuture<'_, ClientResult<Vec<ConversationSummary>>>;

    fn get_conversation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ClientResult<Vec<ChatMessage>>>;

    fn upload_images<'a>(
        &'a self,
        files: &'a [LocalFile],
        redact: bool,
    ) -> BoxFuture<'a, ClientResult<Vec<UploadedImage>>>;

    fn send_message(&self, payload: SendPayload) -> BoxFuture<'_, ClientResult<SendResult>>;
}

impl ChatApi for ApiClient {
    fn list_conversations(&self) -> BoxFuture<'_, ClientResult<Vec<ConversationSummary>>> {
        Box::pin(ApiClient::list_conversations(self))
    }

    fn get_conversation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ClientResult<Vec<ChatMessage>>> {
        Box::pin(ApiClient::get_conversation(self, id))
    }

    fn upload_images<'a>(
        &'a self,
        files: &'a [LocalFile],
        redact: bool,
    ) -> BoxFuture<'a, ClientResult<Vec<UploadedImage>>> {
        Box::pin(ApiClient::upload_images(self, files, redact))
    }

    fn send_message(&self, payload: SendPayload) -> BoxFuture<'_, ClientResult<SendResult>> {
        Box::pin(ApiClient::send_message(self, payload))
    }
}
