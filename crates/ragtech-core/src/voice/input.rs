use tracing::{debug, warn};

use crate::error::VoiceError;
use crate::state::PendingInput;

/// Shown when voice input is requested on a host without a recognizer.
pub const UNAVAILABLE_NOTICE: &str = "Speech recognition not supported on this host.";

/// Identifies one listening run of a recognizer.
pub type RunId = u64;

/// Events a recognition capability emits while listening, tagged with the
/// run that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A recognized utterance.
    Result { run: RunId, transcript: String },
    /// A terminal recognition error.
    Error { run: RunId, reason: String },
    /// The capability stopped on its own or after a stop request.
    End { run: RunId },
}

impl RecognitionEvent {
    pub fn run(&self) -> RunId {
        match self {
            RecognitionEvent::Result { run, .. }
            | RecognitionEvent::Error { run, .. }
            | RecognitionEvent::End { run } => *run,
        }
    }
}

/// A host speech-to-text capability.
///
/// Results are delivered asynchronously as `RecognitionEvent`s through
/// whatever channel the implementation was built with. `start` returns the
/// id every event of the new run carries; ids never repeat.
pub trait Recognizer {
    fn start(&mut self, language: &str) -> Result<RunId, VoiceError>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyListening,
    Unavailable,
    Failed(String),
}

impl StartOutcome {
    /// A line to show the user, if this outcome deserves one.
    pub fn notice(&self) -> Option<String> {
        match self {
            StartOutcome::Started | StartOutcome::AlreadyListening => None,
            StartOutcome::Unavailable => Some(UNAVAILABLE_NOTICE.to_string()),
            StartOutcome::Failed(reason) => Some(format!("Voice input failed: {}", reason)),
        }
    }
}

/// Voice input channel: `idle` ⇄ `listening`.
pub struct VoiceInput {
    recognizer: Option<Box<dyn Recognizer>>,
    language: String,
    state: ListenState,
    run: Option<RunId>,
}

impl VoiceInput {
    /// `None` means the host has no recognition capability; that is decided
    /// here once and every later start reports `Unavailable`.
    pub fn new(recognizer: Option<Box<dyn Recognizer>>, language: &str) -> Self {
        if recognizer.is_none() {
            debug!("no speech recognizer available");
        }
        Self {
            recognizer,
            language: language.to_string(),
            state: ListenState::Idle,
            run: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenState::Listening
    }

    pub fn start(&mut self) -> StartOutcome {
        if self.is_listening() {
            return StartOutcome::AlreadyListening;
        }
        let Some(recognizer) = self.recognizer.as_mut() else {
            return StartOutcome::Unavailable;
        };
        match recognizer.start(&self.language) {
            Ok(run) => {
                self.state = ListenState::Listening;
                self.run = Some(run);
                StartOutcome::Started
            }
            Err(e) => {
                warn!(error = %e, "speech recognition failed to start");
                StartOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.is_listening() {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.state = ListenState::Idle;
    }

    /// Start when idle, stop when listening. Returns the start outcome when
    /// a start was attempted.
    pub fn toggle(&mut self) -> Option<StartOutcome> {
        if self.is_listening() {
            self.stop();
            None
        } else {
            Some(self.start())
        }
    }

    /// Apply a recognition event, appending any transcript to `input`.
    ///
    /// Only events of the current run count, and transcripts only while
    /// listening. Leftovers from a stopped run are dropped.
    pub fn handle_event(&mut self, event: RecognitionEvent, input: &mut PendingInput) {
        if Some(event.run()) != self.run {
            debug!(run = event.run(), "dropping event from an earlier recognition run");
            return;
        }
        match event {
            RecognitionEvent::Result { transcript, .. } => {
                if self.is_listening() {
                    input.append_transcript(&transcript);
                }
            }
            RecognitionEvent::Error { reason, .. } => {
                warn!(%reason, "speech recognition error");
                self.state = ListenState::Idle;
            }
            RecognitionEvent::End { .. } => self.state = ListenState::Idle,
        }
    }
}
