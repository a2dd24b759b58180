use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::answer::normalize;
use crate::error::BackendError;

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// HTTP client for the question-answering backend
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `{question}` to `/ask` and return the response body as structured data.
    ///
    /// A body that is not JSON is retried as JSON after stripping a byte-order
    /// mark and surrounding whitespace, then accepted as a plain string. A
    /// non-2xx status is only an error when the body is not JSON either.
    pub async fn ask(&self, question: &str) -> Result<Value, BackendError> {
        let url = format!("{}/ask", self.base_url);
        debug!(%url, chars = question.chars().count(), "sending question");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            if !status.is_success() {
                warn!(%status, "backend returned an error status with a JSON body");
            }
            return Ok(value);
        }

        let text = String::from_utf8_lossy(&body);
        let cleaned = text.trim_start_matches('\u{feff}').trim();
        if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
            return Ok(value);
        }

        if !status.is_success() {
            return Err(BackendError::Unreachable(format!(
                "backend request failed with status: {}",
                status
            )));
        }

        Ok(Value::String(text.into_owned()))
    }

    /// Ask a question and normalize the answer into display text.
    pub async fn fetch_answer(&self, question: &str) -> Result<String, BackendError> {
        let raw = self.ask(question).await?;
        Ok(normalize(raw))
    }

    /// Probe `GET /` and return the reported status line.
    pub async fn health(&self) -> Result<String, BackendError> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Unreachable(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }

        let health: HealthResponse = response.json().await?;
        Ok(health.status)
    }
}
