//! UI-agnostic conversation state types
//!
//! These are the values persisted to history and observed by the front end.
//! Nothing here knows about storage, the network or any UI framework.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Greeting every new session starts with.
pub const SYSTEM_GREETING: &str = "Connected to RAG-Tech backend.";

/// Title shown until the session has a user message.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Number of characters of the first user message used as the title.
pub const TITLE_MAX_CHARS: usize = 40;

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single entry in a session's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// Last millisecond value handed out by `SessionId::generate`.
static LAST_ID_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Opaque session identifier of the form `chat_<millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate an id that is unique for the lifetime of the process.
    ///
    /// The millisecond clock is bumped past the previously issued value, so
    /// two sessions created within the same millisecond still differ.
    pub fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match LAST_ID_MILLIS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Self(format!("chat_{}", next)),
                Err(current) => last = current,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One conversation thread.
///
/// Fields are private so the title can only change through `push`, which
/// keeps it a function of the messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    title: String,
    messages: Vec<Message>,
}

impl Session {
    /// A fresh session holding only the system greeting.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: vec![Message::system(SYSTEM_GREETING)],
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.refresh_title();
    }

    /// Recompute the title from the messages.
    pub(crate) fn refresh_title(&mut self) {
        self.title = derive_title(&self.messages);
    }
}

/// First `TITLE_MAX_CHARS` characters of the first user message, or the
/// default placeholder.
pub fn derive_title(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.text.chars().take(TITLE_MAX_CHARS).collect::<String>())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Not-yet-sent text, written by the keyboard and by voice transcripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInput {
    text: String,
}

impl PendingInput {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert a character at a character (not byte) position.
    pub fn insert(&mut self, char_idx: usize, c: char) {
        let byte_pos = char_to_byte_index(&self.text, char_idx);
        self.text.insert(byte_pos, c);
    }

    /// Remove the character at a character position, if any.
    pub fn remove(&mut self, char_idx: usize) -> Option<char> {
        if char_idx >= self.char_count() {
            return None;
        }
        let byte_pos = char_to_byte_index(&self.text, char_idx);
        Some(self.text.remove(byte_pos))
    }

    /// Append a transcript, space-separated from any existing content.
    pub fn append_transcript(&mut self, transcript: &str) {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(transcript);
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_greeting() {
        let session = Session::new(SessionId::from("chat_1"));
        assert_eq!(session.messages(), &[Message::system(SYSTEM_GREETING)]);
        assert_eq!(session.title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_title_truncates_first_user_message() {
        let mut session = Session::new(SessionId::from("chat_1"));
        session.push(Message::user("What is a transformer model exactly? Tell me more."));
        assert_eq!(session.title(), "What is a transformer model exactly? Tel");
        assert_eq!(session.title().chars().count(), TITLE_MAX_CHARS);

        session.push(Message::assistant("A neural network architecture."));
        session.push(Message::user("Another question"));
        assert_eq!(session.title(), "What is a transformer model exactly? Tel");
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let text = "é".repeat(50);
        let title = derive_title(&[Message::user(text)]);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_title_ignores_non_user_messages() {
        let title = derive_title(&[Message::system("hello"), Message::assistant("hi")]);
        assert_eq!(title, DEFAULT_TITLE);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: Vec<SessionId> = (0..500).map(|_| SessionId::generate()).collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| id.as_str().starts_with("chat_")));
    }

    #[test]
    fn test_session_json_layout() {
        let mut session = Session::new(SessionId::from("chat_42"));
        session.push(Message::user("hi"));
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "chat_42",
                "title": "hi",
                "messages": [
                    {"role": "system", "text": SYSTEM_GREETING},
                    {"role": "user", "text": "hi"}
                ]
            })
        );
    }

    #[test]
    fn test_pending_input_transcripts_are_additive() {
        let mut input = PendingInput::default();
        input.append_transcript("hello");
        assert_eq!(input.as_str(), "hello");
        input.append_transcript(" world ");
        assert_eq!(input.as_str(), "hello world");
        input.append_transcript("   ");
        assert_eq!(input.as_str(), "hello world");
    }

    #[test]
    fn test_pending_input_editing_is_utf8_safe() {
        let mut input = PendingInput::default();
        for (i, c) in "héllo".chars().enumerate() {
            input.insert(i, c);
        }
        assert_eq!(input.remove(1), Some('é'));
        assert_eq!(input.as_str(), "hllo");
        assert_eq!(input.remove(10), None);
        input.insert(0, '¿');
        assert_eq!(input.as_str(), "¿hllo");
        input.clear();
        assert!(input.is_empty());
    }
}
