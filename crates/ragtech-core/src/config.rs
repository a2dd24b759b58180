use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::voice::Voice;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OUTPUT_LANGUAGE: &str = "en-US";
const DEFAULT_INPUT_LANGUAGE: &str = "en-IN";

/// Environment variable that overrides `backend_url`.
pub const BACKEND_URL_ENV: &str = "RAGTECH_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub voice_output: Option<bool>,
    pub output_language: Option<String>,
    pub input_language: Option<String>,
    pub recognizer_command: Option<Vec<String>>,
    pub synthesizer_command: Option<Vec<String>>,
    pub voices: Option<Vec<Voice>>,
    pub history_path: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: Some(DEFAULT_BACKEND_URL.to_string()),
            voice_output: Some(false),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("invalid config file {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Persist the voice-output toggle without touching other fields.
    pub fn save_voice_output(enabled: bool) -> Result<()> {
        Self::save_voice_output_to(&Self::get_config_path()?, enabled)
    }

    /// A file that does not parse is left as it is and the error returned.
    pub fn save_voice_output_to(config_path: &Path, enabled: bool) -> Result<()> {
        let mut config = Self::load_from(config_path)?;
        config.voice_output = Some(enabled);
        config.save_to(config_path)
    }

    /// The backend URL, with the environment variable taking precedence.
    pub fn backend_url(&self) -> String {
        std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn voice_output_enabled(&self) -> bool {
        self.voice_output.unwrap_or(false)
    }

    pub fn output_language(&self) -> &str {
        self.output_language.as_deref().unwrap_or(DEFAULT_OUTPUT_LANGUAGE)
    }

    pub fn input_language(&self) -> &str {
        self.input_language.as_deref().unwrap_or(DEFAULT_INPUT_LANGUAGE)
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.voices.clone().unwrap_or_default()
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history_path {
            return Ok(path.clone());
        }
        Ok(Self::data_dir()?.join("history.db"))
    }

    /// Directory for history and logs.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("ragtech"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragtech").join("config.json"))
    }
}
