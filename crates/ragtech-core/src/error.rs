//! Error types shared across the core.
//!
//! Only `SessionError` ever reaches a caller as a hard failure. The other
//! kinds are recovered close to where they occur and logged.

use crate::state::SessionId;

/// The single uniform failure of a backend exchange.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Unreachable(err.to_string())
    }
}

/// Failures of the durable key-value slot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of a speech capability.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("voice capability is not available on this host")]
    Unavailable,
    #[error("voice capability error: {0}")]
    Capability(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::Unreachable("connection refused".to_string());
        assert_eq!(err.to_string(), "backend unreachable: connection refused");

        let err = VoiceError::Unavailable;
        assert_eq!(err.to_string(), "voice capability is not available on this host");

        let err = VoiceError::Capability("device busy".to_string());
        assert_eq!(err.to_string(), "voice capability error: device busy");

        let err = SessionError::NotFound(SessionId::from("chat_1"));
        assert_eq!(err.to_string(), "session not found: chat_1");
    }

    #[test]
    fn test_store_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: StoreError = parse_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
