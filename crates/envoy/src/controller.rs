use std::sync::{Mutex, MutexGuard};

use prismchat_shared::schemas::SendResult;
use prismchat_shared::{
    ChatMessage, ConversationSummary, DEFAULT_CONVERSATION_TITLE, Role, RouteMode,
    truncate_chars,
};

use crate::api::ChatApi;
use crate::client::SendPayload;
use crate::error::ClientResult;
use crate::files::LocalFile;

/// Most images the composer will stage for one message.
pub const MAX_STAGED_FILES: usize = 6;
/// Characters of the first user message shown as the header title.
pub const HEADER_TITLE_CHARS: usize = 42;

/// Unsent composer contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub files: Vec<LocalFile>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }
}

#[derive(Default)]
struct ControllerState {
    active_id: Option<String>,
    messages: Vec<ChatMessage>,
    route: RouteMode,
    draft: Draft,
    conversations: Vec<ConversationSummary>,
    // Requests currently awaiting the backend; loading while non-zero.
    in_flight: usize,
    // Bumped by every action that changes which conversation is on screen.
    // A completion tagged with an older value is dropped.
    generation: u64,
}

/// Client-side snapshot of the chat screen and the sequencing of the calls
/// that change it. Methods take `&self` so independent actions can overlap;
/// state is only locked between awaits.
pub struct ConversationController<A> {
    api: A,
    state: Mutex<ControllerState>,
}

struct LoadingGuard<'a> {
    state: &'a Mutex<ControllerState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<A: ChatApi> ConversationController<A> {
    pub fn new(api: A) -> Self {
        Self::with_route(api, RouteMode::default())
    }

    pub fn with_route(api: A, route: RouteMode) -> Self {
        Self {
            api,
            state: Mutex::new(ControllerState {
                route,
                ..Default::default()
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        lock(&self.state)
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state().in_flight += 1;
        LoadingGuard { state: &self.state }
    }

    // ---- snapshots ----

    pub fn active_conversation_id(&self) -> Option<String> {
        self.state().active_id.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().in_flight > 0
    }

    pub fn route(&self) -> RouteMode {
        self.state().route
    }

    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.state().conversations.clone()
    }

    pub fn draft(&self) -> Draft {
        self.state().draft.clone()
    }

    /// Header title: the start of the first user message.
    pub fn title(&self) -> String {
        let state = self.state();
        if state.messages.is_empty() {
            return DEFAULT_CONVERSATION_TITLE.to_string();
        }
        state
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| truncate_chars(&m.content, HEADER_TITLE_CHARS))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Conversation".to_string())
    }

    // ---- composer ----

    pub fn set_route(&self, route: RouteMode) {
        self.state().route = route;
    }

    pub fn set_draft_text(&self, text: impl Into<String>) {
        self.state().draft.text = text.into();
    }

    /// Stages a file. Returns `false` once [`MAX_STAGED_FILES`] are staged.
    pub fn attach_file(&self, file: LocalFile) -> bool {
        let mut state = self.state();
        if state.draft.files.len() >= MAX_STAGED_FILES {
            return false;
        }
        state.draft.files.push(file);
        true
    }

    pub fn clear_draft(&self) {
        self.state().draft = Draft::default();
    }

    // ---- actions ----

    pub fn new_chat(&self) {
        let mut state = self.state();
        state.active_id = None;
        state.messages.clear();
        state.generation += 1;
    }

    /// Shows `id` right away and loads its messages. Failure leaves an empty
    /// conversation on screen.
    pub async fn select_conversation(&self, id: &str) {
        let generation = {
            let mut state = self.state();
            state.active_id = Some(id.to_string());
            state.generation += 1;
            state.generation
        };
        let _loading = self.begin_loading();

        let result = self.api.get_conversation(id).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(conversation_id = %id, "dropping stale conversation load");
            return;
        }
        match result {
            Ok(messages) => state.messages = messages,
            Err(e) => {
                tracing::warn!(conversation_id = %id, error = %e, "failed to load conversation");
                state.messages.clear();
            }
        }
    }

    /// Reloads the sidebar. Failure shows an empty list.
    pub async fn refresh_conversations(&self) -> Vec<ConversationSummary> {
        let conversations = match self.api.list_conversations().await {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list conversations");
                Vec::new()
            }
        };
        self.state().conversations = conversations.clone();
        conversations
    }

    /// Uploads `files` (if any), then sends. Returns whether the message was
    /// delivered; on failure the composer draft is left as it was.
    pub async fn send(&self, text: &str, files: Vec<LocalFile>) -> bool {
        let text = text.trim().to_string();
        if text.is_empty() && files.is_empty() {
            return false;
        }

        let (generation, conversation_id, route) = {
            let mut state = self.state();
            state.generation += 1;
            (state.generation, state.active_id.clone(), state.route)
        };

        let result = {
            let _loading = self.begin_loading();
            self.deliver(conversation_id, route, text, files).await
        };

        match result {
            Ok(result) => {
                {
                    let mut state = self.state();
                    state.draft = Draft::default();
                    if state.generation == generation {
                        if state.active_id.is_none() {
                            state.active_id = Some(result.conversation_id.clone());
                        }
                        state.messages = result.messages;
                    } else {
                        tracing::debug!(
                            conversation_id = %result.conversation_id,
                            "conversation changed while sending, not replacing messages"
                        );
                    }
                }
                self.refresh_conversations().await;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to send message");
                false
            }
        }
    }

    /// Sends whatever is in the composer.
    pub async fn send_draft(&self) -> bool {
        let draft = self.draft();
        self.send(&draft.text, draft.files).await
    }

    async fn deliver(
        &self,
        conversation_id: Option<String>,
        route: RouteMode,
        text: String,
        files: Vec<LocalFile>,
    ) -> ClientResult<SendResult> {
        // Upload strictly before send; the message references the URLs.
        let images = self.api.upload_images(&files, route.redacts()).await?;

        self.api
            .send_message(SendPayload {
                conversation_id,
                route,
                text: Some(text),
                images,
            })
            .await
    }
}
