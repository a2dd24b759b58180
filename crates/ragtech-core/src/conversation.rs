//! The send cycle and the glue between sessions, input and voice.
//!
//! A send is split in two so the network call can run outside `&mut self`:
//! `begin_send` appends the user message and takes the in-flight slot,
//! `complete_send` appends the reply and always releases the slot. At most one
//! `PendingSend` exists at a time.
//!
//! A reply lands on the session the question was asked in, even if another
//! session is active by then. If that session was deleted the reply is
//! dropped.

use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

use crate::client::BackendClient;
use crate::error::{BackendError, SessionError};
use crate::session::SessionStore;
use crate::state::{Message, PendingInput, SessionId};
use crate::store::KeyValueStore;
use crate::voice::{RecognitionEvent, StartOutcome, VoiceInput, VoiceOutput};

/// Reply appended when the backend cannot be reached.
pub const BACKEND_ERROR_TEXT: &str = "Error: Cannot reach backend. Make sure it's running.";

/// Something that can answer a question with display text.
pub trait AskBackend {
    fn answer(&self, question: &str) -> impl Future<Output = Result<String, BackendError>> + Send;
}

impl AskBackend for BackendClient {
    fn answer(&self, question: &str) -> impl Future<Output = Result<String, BackendError>> + Send {
        let client = self.clone();
        let question = question.to_string();
        async move { client.fetch_answer(&question).await }
    }
}

/// A question that has been appended and is waiting for its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    session_id: SessionId,
    question: String,
}

impl PendingSend {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// How a send cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Answered { session_id: SessionId, spoken: bool },
    Failed { session_id: SessionId },
    Discarded { session_id: SessionId },
}

pub struct Conversation<S> {
    sessions: SessionStore<S>,
    input: PendingInput,
    in_flight: Option<SessionId>,
    voice_input: VoiceInput,
    voice_output: VoiceOutput,
}

impl<S: KeyValueStore> Conversation<S> {
    pub fn new(sessions: SessionStore<S>, voice_input: VoiceInput, voice_output: VoiceOutput) -> Self {
        Self {
            sessions,
            input: PendingInput::default(),
            in_flight: None,
            voice_input,
            voice_output,
        }
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    pub fn input(&self) -> &PendingInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut PendingInput {
        &mut self.input
    }

    pub fn voice_input(&self) -> &VoiceInput {
        &self.voice_input
    }

    pub fn voice_output(&self) -> &VoiceOutput {
        &self.voice_output
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The session whose question is waiting for a reply.
    pub fn awaiting_session(&self) -> Option<&SessionId> {
        self.in_flight.as_ref()
    }

    /// Whether the reply being waited for belongs to the active session.
    pub fn is_awaiting_active(&self) -> bool {
        self.in_flight.is_some() && self.in_flight.as_ref() == self.sessions.active_id()
    }

    /// Messages of the active session, or none when no session is active.
    pub fn active_messages(&self) -> &[Message] {
        self.sessions
            .active_session()
            .map(|s| s.messages())
            .unwrap_or(&[])
    }

    pub fn new_session(&mut self) -> SessionId {
        let id = self.sessions.create_session().id().clone();
        self.input.clear();
        id
    }

    pub fn select_session(&mut self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.select_session(id)?;
        self.input.clear();
        Ok(())
    }

    pub fn delete_session(&mut self, id: &SessionId) -> bool {
        let was_active = self.sessions.active_id() == Some(id);
        let deleted = self.sessions.delete_session(id);
        if deleted && was_active {
            self.input.clear();
        }
        deleted
    }

    /// Start a send cycle with the pending input.
    pub fn submit_input(&mut self) -> Option<PendingSend> {
        let text = self.input.as_str().to_string();
        self.begin_send(&text)
    }

    /// Append the user message and take the in-flight slot.
    ///
    /// Returns `None` for blank text or while another send is in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let session_id = self.sessions.ensure_active();

        let question = text.trim();
        if question.is_empty() || self.in_flight.is_some() {
            return None;
        }

        if let Err(e) = self.sessions.append_message(&session_id, Message::user(question)) {
            warn!(error = %e, "could not append user message");
            return None;
        }
        self.input.clear();
        self.in_flight = Some(session_id.clone());
        info!(session = %session_id, "question sent");

        Some(PendingSend {
            session_id,
            question: question.to_string(),
        })
    }

    /// Finish a send cycle with the backend's result.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<String, BackendError>,
    ) -> Completion {
        self.in_flight = None;
        let session_id = pending.session_id;

        if self.sessions.get(&session_id).is_none() {
            info!(session = %session_id, "reply arrived for a deleted session, dropping it");
            return Completion::Discarded { session_id };
        }

        match result {
            Ok(answer) => {
                if let Err(e) = self
                    .sessions
                    .append_message(&session_id, Message::assistant(answer.as_str()))
                {
                    warn!(error = %e, "could not append reply");
                    return Completion::Discarded { session_id };
                }
                let spoken = self.voice_output.speak(&answer);
                Completion::Answered { session_id, spoken }
            }
            Err(e) => {
                warn!(error = %e, session = %session_id, "backend call failed");
                if let Err(e) = self
                    .sessions
                    .append_message(&session_id, Message::assistant(BACKEND_ERROR_TEXT))
                {
                    warn!(error = %e, "could not append error reply");
                }
                Completion::Failed { session_id }
            }
        }
    }

    /// Run a whole send cycle against `backend`.
    ///
    /// A panic inside the backend future counts as an unreachable backend so
    /// the in-flight slot is still released.
    pub async fn send_message<B: AskBackend>(&mut self, backend: &B, text: &str) -> Option<Completion> {
        let pending = self.begin_send(text)?;
        let result = AssertUnwindSafe(backend.answer(pending.question()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(BackendError::Unreachable("backend call panicked".to_string())));
        Some(self.complete_send(pending, result))
    }

    pub fn toggle_voice_input(&mut self) -> Option<StartOutcome> {
        self.voice_input.toggle()
    }

    pub fn handle_recognition(&mut self, event: RecognitionEvent) {
        self.voice_input.handle_event(event, &mut self.input);
    }

    pub fn toggle_voice_output(&mut self) -> bool {
        self.voice_output.toggle()
    }
}
