use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use prismchat_shared::{
    ChatMessage, ConversationSummary, DEFAULT_CONVERSATION_TITLE, Role, truncate_chars,
};

/// Characters of the first user message kept as the conversation title.
pub const TITLE_PREFIX_CHARS: usize = 40;

struct ConversationRow {
    meta: ConversationSummary,
    // Creation order, used to break updated_at ties when listing.
    seq: u64,
    messages: Vec<ChatMessage>,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, ConversationRow>,
    next_seq: u64,
}

/// In-memory conversation store for local development. Lives as long as the
/// process; nothing is persisted.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<Inner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another handler panicked mid-append;
        // the map itself is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All conversations, most recently updated first.
    pub fn list_conversations(&self) -> Vec<ConversationSummary> {
        let inner = self.lock();
        let mut rows: Vec<&ConversationRow> = inner.conversations.values().collect();
        rows.sort_by(|a, b| {
            b.meta
                .updated_at
                .cmp(&a.meta.updated_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        rows.into_iter().map(|row| row.meta.clone()).collect()
    }

    /// Messages of a conversation in append order, or `None` if it doesn't exist.
    pub fn get_conversation(&self, id: &str) -> Option<Vec<ChatMessage>> {
        self.lock()
            .conversations
            .get(id)
            .map(|row| row.messages.clone())
    }

    /// Returns `id` if that conversation exists, otherwise creates it (with a
    /// fresh UUID when no id was given).
    pub fn ensure_conversation(&self, id: Option<&str>) -> String {
        let mut inner = self.lock();

        if let Some(id) = id {
            if inner.conversations.contains_key(id) {
                return id.to_string();
            }
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.conversations.insert(
            id.clone(),
            ConversationRow {
                meta: ConversationSummary {
                    id: id.clone(),
                    title: DEFAULT_CONVERSATION_TITLE.to_string(),
                    created_at: now,
                    updated_at: now,
                },
                seq,
                messages: Vec::new(),
            },
        );
        tracing::debug!(conversation_id = %id, "created conversation");

        id
    }

    /// Appends a message. Returns `false` if the conversation doesn't exist.
    pub fn add_message(&self, conversation_id: &str, message: ChatMessage) -> bool {
        let mut inner = self.lock();
        let Some(row) = inner.conversations.get_mut(conversation_id) else {
            return false;
        };
        row.push(message);
        true
    }

    /// Appends a user message and its reply under one lock, so concurrent
    /// turns on the same conversation never interleave. Returns the full
    /// message list, or `None` if the conversation doesn't exist.
    pub fn append_turn(
        &self,
        conversation_id: &str,
        user: ChatMessage,
        reply: ChatMessage,
    ) -> Option<Vec<ChatMessage>> {
        let mut inner = self.lock();
        let row = inner.conversations.get_mut(conversation_id)?;
        row.push(user);
        row.push(reply);
        Some(row.messages.clone())
    }
}

impl ConversationRow {
    fn push(&mut self, message: ChatMessage) {
        if message.created_at > self.meta.updated_at {
            self.meta.updated_at = message.created_at;
        }
        if self.meta.title == DEFAULT_CONVERSATION_TITLE
            && message.role == Role::User
            && !message.content.trim().is_empty()
        {
            self.meta.title = truncate_chars(message.content.trim(), TITLE_PREFIX_CHARS);
        }
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message_at(role: Role, content: &str, offset_secs: i64) -> ChatMessage {
        let mut msg = ChatMessage::new(role, content, vec![]);
        msg.created_at = Utc::now() + Duration::seconds(offset_secs);
        msg
    }

    #[test]
    fn ensure_returns_existing_id() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);
        assert_eq!(store.ensure_conversation(Some(&id)), id);
        assert_eq!(store.list_conversations().len(), 1);
    }

    #[test]
    fn ensure_adopts_caller_supplied_id() {
        let store = MockStore::new();
        let id = store.ensure_conversation(Some("client-generated"));
        assert_eq!(id, "client-generated");
        assert_eq!(store.get_conversation("client-generated"), Some(vec![]));
    }

    #[test]
    fn messages_keep_append_order() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert!(store.add_message(&id, message_at(role, &format!("m{i}"), i)));
        }

        let contents: Vec<String> = store
            .get_conversation(&id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn title_comes_from_first_user_message() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);
        store.add_message(&id, message_at(Role::Assistant, "greeting", 0));
        store.add_message(
            &id,
            message_at(Role::User, "  a fairly long opening question that exceeds forty characters", 1),
        );
        store.add_message(&id, message_at(Role::User, "second", 2));

        let summary = &store.list_conversations()[0];
        assert_eq!(summary.title, "a fairly long opening question that exce");
        assert_eq!(summary.title.chars().count(), TITLE_PREFIX_CHARS);
    }

    #[test]
    fn image_only_user_message_keeps_default_title() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);
        store.add_message(&id, ChatMessage::user("", vec!["/uploads/a.png".into()]));
        assert_eq!(store.list_conversations()[0].title, DEFAULT_CONVERSATION_TITLE);
    }

    #[test]
    fn updated_at_tracks_latest_message() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);
        let msg = message_at(Role::User, "hi", 30);
        let stamp = msg.created_at;
        store.add_message(&id, msg);

        let summary = &store.list_conversations()[0];
        assert_eq!(summary.updated_at, stamp);
        assert!(summary.updated_at >= summary.created_at);
    }

    #[test]
    fn list_is_newest_first_and_stable() {
        let store = MockStore::new();
        let older = store.ensure_conversation(Some("older"));
        let newer = store.ensure_conversation(Some("newer"));
        store.add_message(&older, message_at(Role::User, "a", 10));
        store.add_message(&newer, message_at(Role::User, "b", 20));

        let first = store.list_conversations();
        let ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(store.list_conversations(), first);
    }

    #[test]
    fn turn_is_appended_as_a_pair() {
        let store = MockStore::new();
        let id = store.ensure_conversation(None);

        let messages = store
            .append_turn(&id, ChatMessage::user("question", vec![]), ChatMessage::assistant("answer"))
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(store.list_conversations()[0].title, "question");
        assert!(
            store
                .append_turn("nope", ChatMessage::user("x", vec![]), ChatMessage::assistant("y"))
                .is_none()
        );
    }

    #[test]
    fn concurrent_turns_never_interleave() {
        let store = std::sync::Arc::new(MockStore::new());
        let id = store.ensure_conversation(None);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let text = format!("t{t}-{i}");
                        store.append_turn(
                            &id,
                            ChatMessage::user(text.clone(), vec![]),
                            ChatMessage::assistant(format!("re:{text}")),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let messages = store.get_conversation(&id).unwrap();
        assert_eq!(messages.len(), 8 * 25 * 2);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].content, format!("re:{}", pair[0].content));
        }
    }

    #[test]
    fn add_to_missing_conversation_is_rejected() {
        let store = MockStore::new();
        assert!(!store.add_message("nope", ChatMessage::assistant("x")));
        assert!(store.get_conversation("nope").is_none());
    }
}
