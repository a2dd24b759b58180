//! Speech capabilities backed by external programs.
//!
//! A recognizer command prints one transcript per line on stdout and exits
//! when the utterance ends. A synthesizer command speaks its arguments.
//! Arguments may contain `{lang}`, `{voice}` and `{text}` placeholders.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::input::{RecognitionEvent, Recognizer, RunId};
use super::output::{Synthesizer, Utterance, Voice};
use crate::error::VoiceError;

/// Resolve a program name against `PATH`, or check an explicit path.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

fn substitute(args: &[String], lang: &str, voice: &str, text: &str) -> Vec<String> {
    args.iter()
        .map(|arg| {
            arg.replace("{lang}", lang)
                .replace("{voice}", voice)
                .replace("{text}", text)
        })
        .collect()
}

fn require_runtime() -> Result<(), VoiceError> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|_| VoiceError::Capability("no async runtime to run the voice command".to_string()))
}

/// Runs a transcription command per listening session.
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    stop_tx: Option<oneshot::Sender<()>>,
    // Bumped on every start; tags the events of that run.
    generation: RunId,
}

impl CommandRecognizer {
    /// Build a recognizer from an argv, or `None` if the program is missing.
    pub fn detect(argv: &[String], events: mpsc::UnboundedSender<RecognitionEvent>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        let Some(program) = find_program(program) else {
            info!(%program, "speech recognizer command not found");
            return None;
        };
        Some(Self {
            program,
            args: args.to_vec(),
            events,
            stop_tx: None,
            generation: 0,
        })
    }
}

impl Recognizer for CommandRecognizer {
    fn start(&mut self, language: &str) -> Result<RunId, VoiceError> {
        require_runtime()?;

        let mut child = Command::new(&self.program)
            .args(substitute(&self.args, language, "", ""))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Capability(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::Capability("recognizer stdout unavailable".to_string()))?;

        self.generation += 1;
        let run = self.generation;

        // Replacing the sender also ends a previous run that is still alive
        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        let events = self.events.clone();
        debug!(program = %self.program.display(), run, "speech recognizer started");

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        let _ = child.kill().await;
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let transcript = line.trim();
                            if !transcript.is_empty() {
                                let _ = events.send(RecognitionEvent::Result {
                                    run,
                                    transcript: transcript.to_string(),
                                });
                            }
                        }
                        Ok(None) => {
                            match child.wait().await {
                                Ok(status) if !status.success() => {
                                    let _ = events.send(RecognitionEvent::Error {
                                        run,
                                        reason: format!("recognizer exited with {}", status),
                                    });
                                }
                                Err(e) => {
                                    let _ = events.send(RecognitionEvent::Error {
                                        run,
                                        reason: e.to_string(),
                                    });
                                }
                                Ok(_) => {}
                            }
                            break;
                        }
                        Err(e) => {
                            let _ = events.send(RecognitionEvent::Error {
                                run,
                                reason: e.to_string(),
                            });
                            let _ = child.kill().await;
                            break;
                        }
                    }
                }
            }
            let _ = events.send(RecognitionEvent::End { run });
        });

        Ok(run)
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Speaks each utterance by running a command; a new utterance kills the
/// previous process.
pub struct CommandSynthesizer {
    program: PathBuf,
    args: Vec<String>,
    voices: Vec<Voice>,
    current: Option<Child>,
}

impl CommandSynthesizer {
    pub fn detect(argv: &[String], voices: Vec<Voice>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        let Some(program) = find_program(program) else {
            info!(%program, "speech synthesizer command not found");
            return None;
        };
        Some(Self {
            program,
            args: args.to_vec(),
            voices,
            current: None,
        })
    }

    fn build_args(&self, utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .voice
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or(utterance.lang.as_str());
        let mut args = substitute(&self.args, &utterance.lang, voice, &utterance.text);
        if !self.args.iter().any(|a| a.contains("{text}")) {
            args.push(utterance.text.clone());
        }
        args
    }
}

impl Synthesizer for CommandSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), VoiceError> {
        require_runtime()?;
        let child = Command::new(&self.program)
            .args(self.build_args(&utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Capability(e.to_string()))?;
        self.current = Some(child);
        Ok(())
    }

    fn cancel_all(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.start_kill() {
                // The process usually finished on its own already.
                debug!(error = %e, "synthesizer process was not running");
            }
        }
    }
}
