//! Speech input and output channels.
//!
//! The state machines here only see the `Recognizer` and `Synthesizer`
//! traits. `command` provides host implementations backed by external
//! programs; tests drive the traits with scripted doubles.

pub mod command;
pub mod input;
pub mod output;

pub use command::{find_program, CommandRecognizer, CommandSynthesizer};
pub use input::{ListenState, RecognitionEvent, Recognizer, RunId, StartOutcome, VoiceInput, UNAVAILABLE_NOTICE};
pub use output::{Synthesizer, Utterance, Voice, VoiceOutput};
