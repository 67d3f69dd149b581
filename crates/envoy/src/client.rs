use prismchat_shared::schemas::{
    ChatRequest, ConversationHistory, ListConversationsResponse, SendResult, UploadResponse,
};
use prismchat_shared::{ChatMessage, ConversationSummary, Role, RouteMode, UploadedImage};
use reqwest::header::CACHE_CONTROL;
use snafu::ResultExt;

use crate::error::{
    ClientResult, DecodeSnafu, NetworkSnafu, NotFoundSnafu, SendSnafu, UnavailableSnafu,
    UploadSnafu, ValidationSnafu,
};
use crate::files::LocalFile;

const LIST_ENDPOINT: &str = "GET /v1/conversations";
const GET_ENDPOINT: &str = "GET /v1/conversations/{id}";
const CHAT_ENDPOINT: &str = "POST /v1/chat";
const HEALTH_ENDPOINT: &str = "GET /healthz";

/// What the composer hands to [`ApiClient::send_message`].
#[derive(Clone, Debug, Default)]
pub struct SendPayload {
    /// `None` on the first send of a new chat; an id is generated locally.
    pub conversation_id: Option<String>,
    pub route: RouteMode,
    pub text: Option<String>,
    pub images: Vec<UploadedImage>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(endpoint = HEALTH_ENDPOINT, error = %e, "health check failed");
                false
            }
        }
    }

    /// Conversation summaries, newest activity first.
    pub async fn list_conversations(&self) -> ClientResult<Vec<ConversationSummary>> {
        let url = format!("{}/v1/conversations", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .context(NetworkSnafu { endpoint: LIST_ENDPOINT })?;

        if !response.status().is_success() {
            return UnavailableSnafu {
                endpoint: LIST_ENDPOINT,
                status: response.status().as_u16(),
            }
            .fail();
        }

        let mut data = response
            .json::<ListConversationsResponse>()
            .await
            .context(DecodeSnafu { endpoint: LIST_ENDPOINT })?;

        // Stable, so equal timestamps keep the backend's order
        data.conversations
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(data.conversations)
    }

    /// Messages of one conversation, oldest first.
    pub async fn get_conversation(&self, conversation_id: &str) -> ClientResult<Vec<ChatMessage>> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return ValidationSnafu {
                details: "conversation id is empty",
            }
            .fail();
        }

        let url = format!(
            "{}/v1/conversations/{}",
            self.base_url,
            urlencoding::encode(conversation_id)
        );

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .context(NetworkSnafu { endpoint: GET_ENDPOINT })?;

        if !response.status().is_success() {
            return NotFoundSnafu {
                id: conversation_id,
                status: response.status().as_u16(),
            }
            .fail();
        }

        let history = response
            .json::<ConversationHistory>()
            .await
            .context(DecodeSnafu { endpoint: GET_ENDPOINT })?;
        Ok(history.messages)
    }

    /// Uploads the whole batch in one request. Either every file gets a URL
    /// or the call fails; previews are always built from the local bytes.
    pub async fn upload_images(
        &self,
        files: &[LocalFile],
        redact: bool,
    ) -> ClientResult<Vec<UploadedImage>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/upload", self.base_url);

        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| {
                    UploadSnafu {
                        details: format!("{}: {}", file.name, e),
                    }
                    .build()
                })?;
            form = form.part("files", part);
        }

        let mut request = self.client.post(&url).multipart(form);
        if redact {
            request = request.query(&[("route", RouteMode::Prismguard.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            UploadSnafu {
                details: e.to_string(),
            }
            .build()
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return UploadSnafu {
                details: format!("{} {}", status, body),
            }
            .fail();
        }

        let data = response.json::<UploadResponse>().await.map_err(|e| {
            UploadSnafu {
                details: e.to_string(),
            }
            .build()
        })?;

        if data.urls.len() != files.len() {
            return UploadSnafu {
                details: format!("sent {} files but got {} URLs", files.len(), data.urls.len()),
            }
            .fail();
        }

        Ok(files
            .iter()
            .zip(data.urls)
            .map(|(file, url)| UploadedImage {
                storage_url: self.resolve_url(&url),
                preview_url: Some(file.preview_url()),
            })
            .collect())
    }

    /// Sends one turn and returns the conversation's full message list. On the
    /// prismguard route the last user message is replaced with what the user
    /// actually typed and attached.
    pub async fn send_message(&self, payload: SendPayload) -> ClientResult<SendResult> {
        let text = payload
            .text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if text.is_empty() && payload.images.is_empty() {
            return ValidationSnafu {
                details: "a message needs text or at least one image",
            }
            .fail();
        }

        let conversation_id = payload
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let request = ChatRequest {
            conversation_id: Some(conversation_id.clone()),
            route: payload.route,
            text: (!text.is_empty()).then(|| text.clone()),
            images: payload
                .images
                .iter()
                .map(|image| image.storage_url.clone())
                .collect(),
        };

        let url = format!("{}/v1/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context(NetworkSnafu { endpoint: CHAT_ENDPOINT })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return SendSnafu { status, body }.fail();
        }

        let mut result = response
            .json::<SendResult>()
            .await
            .context(DecodeSnafu { endpoint: CHAT_ENDPOINT })?;

        if result.conversation_id.is_empty() {
            result.conversation_id = conversation_id;
        }

        if payload.route == RouteMode::Prismguard {
            restore_sender_view(&mut result.messages, &text, &payload.images);
        }

        Ok(result)
    }

    /// Resolves a root-relative storage URL (`/uploads/x.png`) against the
    /// backend base URL. Absolute and `data:` URLs pass through.
    pub fn resolve_url(&self, url: &str) -> String {
        match reqwest::Url::parse(url) {
            Ok(_) => url.to_string(),
            Err(_) => reqwest::Url::parse(&self.base_url)
                .and_then(|base| base.join(url))
                .map(|resolved| resolved.to_string())
                .unwrap_or_else(|_| url.to_string()),
        }
    }
}

/// Overwrites the last user-role message with the sender's original text and
/// local previews, so a redacted server copy is never shown back to them.
/// Returns `false` if the list has no user message.
pub fn restore_sender_view(
    messages: &mut [ChatMessage],
    text: &str,
    images: &[UploadedImage],
) -> bool {
    let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == Role::User) else {
        return false;
    };

    last_user.content = text.to_string();
    last_user.images = images
        .iter()
        .map(|image| image.display_url().to_string())
        .collect();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use axum::{Json, Router, body::Bytes, http::StatusCode, routing::post};
    use serde_json::json;

    async fn serve(app: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        ApiClient::new(format!("http://{}", addr))
    }

    fn two_files() -> Vec<LocalFile> {
        vec![
            LocalFile::new("a.png", b"a".to_vec()),
            LocalFile::new("b.png", b"b".to_vec()),
        ]
    }

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage::new(role, content, vec![])
    }

    #[test]
    fn restore_targets_last_user_message() {
        let mut messages = vec![
            msg(Role::User, "earlier question"),
            msg(Role::Assistant, "earlier answer"),
            msg(Role::User, "[REDACTED]"),
            msg(Role::Assistant, "protected reply"),
        ];
        let images = vec![UploadedImage {
            storage_url: "http://cdn/redacted.png".into(),
            preview_url: Some("data:image/png;base64,AA==".into()),
        }];

        assert!(restore_sender_view(&mut messages, "secret info", &images));
        assert_eq!(messages[0].content, "earlier question");
        assert_eq!(messages[2].content, "secret info");
        assert_eq!(messages[2].images, vec!["data:image/png;base64,AA=="]);
        assert_eq!(messages[3].content, "protected reply");
    }

    #[test]
    fn restore_without_user_message_is_a_no_op() {
        let mut messages = vec![msg(Role::Assistant, "hello")];
        assert!(!restore_sender_view(&mut messages, "x", &[]));
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn resolves_relative_upload_urls() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.resolve_url("/uploads/1-a.png"),
            "http://localhost:8000/uploads/1-a.png"
        );
        assert_eq!(
            client.resolve_url("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
        assert_eq!(
            client.resolve_url("data:image/png;base64,AA=="),
            "data:image/png;base64,AA=="
        );
    }

    #[tokio::test]
    async fn empty_id_is_rejected_before_any_request() {
        // Nothing listens on this port; a request would be a network error.
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.get_conversation("  ").await.unwrap_err();
        assert!(matches!(err, crate::error::ClientError::Validation { .. }));
    }

    #[tokio::test]
    async fn empty_send_is_rejected_before_any_request() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client
            .send_message(SendPayload {
                text: Some("   ".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ClientError::Validation { .. }));
    }

    #[tokio::test]
    async fn empty_upload_skips_the_request() {
        let client = ApiClient::new("http://127.0.0.1:9");
        assert!(client.upload_images(&[], true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_send_keeps_status_and_body() {
        async fn reject(_body: Bytes) -> (StatusCode, &'static str) {
            (StatusCode::UNPROCESSABLE_ENTITY, "bad payload")
        }
        let client = serve(Router::new().route("/v1/chat", post(reject))).await;

        let err = client
            .send_message(SendPayload {
                text: Some("hello".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            ClientError::Send { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad payload");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn upload_with_too_few_urls_fails_the_batch() {
        async fn short(_body: Bytes) -> Json<serde_json::Value> {
            Json(json!({ "urls": ["/uploads/only-one.png"] }))
        }
        let client = serve(Router::new().route("/v1/upload", post(short))).await;

        let err = client.upload_images(&two_files(), false).await.unwrap_err();

        match err {
            ClientError::Upload { details } => assert!(details.contains("sent 2 files but got 1"), "{details}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn upload_server_error_is_an_upload_error() {
        async fn fail(_body: Bytes) -> (StatusCode, &'static str) {
            (StatusCode::INTERNAL_SERVER_ERROR, "disk full")
        }
        let client = serve(Router::new().route("/v1/upload", post(fail))).await;

        let err = client.upload_images(&two_files(), true).await.unwrap_err();

        match err {
            ClientError::Upload { details } => {
                assert!(details.contains("500"), "{details}");
                assert!(details.contains("disk full"), "{details}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_conversation_id_in_reply_falls_back_to_sent_one() {
        async fn reply(Json(req): Json<serde_json::Value>) -> Json<serde_json::Value> {
            assert!(req["conversation_id"].is_string());
            Json(json!({ "messages": [] }))
        }
        let client = serve(Router::new().route("/v1/chat", post(reply))).await;

        let result = client
            .send_message(SendPayload {
                conversation_id: Some("kept-id".into()),
                text: Some("hi".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.conversation_id, "kept-id");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.list_conversations().await.unwrap_err();
        assert!(err.is_network());
    }
}
