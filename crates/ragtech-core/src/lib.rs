pub mod answer;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod state;
pub mod store;
pub mod voice;

// Re-export main types for convenience
pub use answer::{normalize, BackendPayload};
pub use client::BackendClient;
pub use config::Config;
pub use conversation::{AskBackend, Completion, Conversation, PendingSend, BACKEND_ERROR_TEXT};
pub use error::{BackendError, SessionError, StoreError, VoiceError};
pub use session::SessionStore;
pub use state::{Message, PendingInput, Role, Session, SessionId};
pub use store::{History, KeyValueStore, MemoryStore, SqliteStore};
pub use voice::{
    CommandRecognizer, CommandSynthesizer, ListenState, RecognitionEvent, Recognizer, RunId,
    StartOutcome, Synthesizer, Utterance, Voice, VoiceInput, VoiceOutput,
};
