use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VoiceError;

/// A synthesis voice offered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
}

/// A host text-to-speech capability.
pub trait Synthesizer {
    fn voices(&self) -> Vec<Voice>;
    fn speak(&mut self, utterance: Utterance) -> Result<(), VoiceError>;
    fn cancel_all(&mut self);
}

/// Voice output channel, gated by a user toggle.
pub struct VoiceOutput {
    synthesizer: Option<Box<dyn Synthesizer>>,
    enabled: bool,
    language: String,
}

impl VoiceOutput {
    pub fn new(synthesizer: Option<Box<dyn Synthesizer>>, language: &str, enabled: bool) -> Self {
        Self {
            synthesizer,
            enabled,
            language: language.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            if let Some(synthesizer) = self.synthesizer.as_mut() {
                synthesizer.cancel_all();
            }
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Speak `text`, interrupting anything still playing.
    ///
    /// Returns whether an utterance was handed to the synthesizer. Errors are
    /// logged here and never reach the caller.
    pub fn speak(&mut self, text: &str) -> bool {
        if !self.enabled || text.trim().is_empty() {
            return false;
        }
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return false;
        };

        synthesizer.cancel_all();
        let voice = pick_voice(&synthesizer.voices(), &self.language);
        let utterance = Utterance {
            text: text.to_string(),
            lang: self.language.clone(),
            voice,
        };
        match synthesizer.speak(utterance) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "speech synthesis failed");
                false
            }
        }
    }
}

/// Prefer a voice in the same language family (`en` for `en-US`), else the
/// first voice.
pub fn pick_voice(voices: &[Voice], language: &str) -> Option<Voice> {
    let family = language_family(language);
    voices
        .iter()
        .find(|v| language_family(&v.lang) == family)
        .or_else(|| voices.first())
        .cloned()
}

fn language_family(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        spoken: Vec<Utterance>,
        cancels: usize,
    }

    struct RecordingSynthesizer {
        voices: Vec<Voice>,
        log: Rc<RefCell<Log>>,
        fail: bool,
    }

    impl Synthesizer for RecordingSynthesizer {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: Utterance) -> Result<(), VoiceError> {
            if self.fail {
                return Err(VoiceError::Capability("audio device lost".to_string()));
            }
            self.log.borrow_mut().spoken.push(utterance);
            Ok(())
        }

        fn cancel_all(&mut self) {
            self.log.borrow_mut().cancels += 1;
        }
    }

    fn voice(name: &str, lang: &str) -> Voice {
        Voice {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    fn output(voices: Vec<Voice>, enabled: bool, fail: bool) -> (VoiceOutput, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let synthesizer = RecordingSynthesizer {
            voices,
            log: Rc::clone(&log),
            fail,
        };
        (VoiceOutput::new(Some(Box::new(synthesizer)), "en-US", enabled), log)
    }

    #[test]
    fn test_disabled_or_empty_is_noop() {
        let (mut out, log) = output(vec![], false, false);
        assert!(!out.speak("hello"));

        out.set_enabled(true);
        assert!(!out.speak("   "));
        assert!(log.borrow().spoken.is_empty());
    }

    #[test]
    fn test_speak_cancels_previous_utterance() {
        let (mut out, log) = output(vec![voice("Alex", "en-US")], true, false);
        assert!(out.speak("first"));
        assert!(out.speak("second"));

        let log = log.borrow();
        assert_eq!(log.cancels, 2);
        let texts: Vec<_> = log.spoken.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(log.spoken[0].lang, "en-US");
    }

    #[test]
    fn test_voice_selection_prefers_language_family() {
        let voices = vec![voice("Thomas", "fr-FR"), voice("Veena", "en_IN"), voice("Alex", "en-US")];
        assert_eq!(pick_voice(&voices, "en-US").unwrap().name, "Veena");
        assert_eq!(pick_voice(&voices, "de-DE").unwrap().name, "Thomas");
        assert_eq!(pick_voice(&[], "en-US"), None);
    }

    #[test]
    fn test_no_voices_still_speaks() {
        let (mut out, log) = output(vec![], true, false);
        assert!(out.speak("hello"));
        assert_eq!(log.borrow().spoken[0].voice, None);
    }

    #[test]
    fn test_synthesis_errors_are_swallowed() {
        let (mut out, _log) = output(vec![], true, true);
        assert!(!out.speak("hello"));
    }

    #[test]
    fn test_missing_synthesizer_is_noop() {
        let mut out = VoiceOutput::new(None, "en-US", true);
        assert!(!out.speak("hello"));
    }

    #[test]
    fn test_toggle_off_silences_playback() {
        let (mut out, log) = output(vec![], true, false);
        assert!(!out.toggle());
        assert_eq!(log.borrow().cancels, 1);
        assert!(out.toggle());
    }
}
