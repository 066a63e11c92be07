use serde::Serialize;
use thiserror::Error;

use crate::engine::types::AppStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No saved session found")]
    NoSavedSession,

    #[error("Session error: {0}")]
    Session(String),

    #[error("No session loaded")]
    NoSession,

    #[error("Integrity too low ({level}%). Wait for it to regenerate before scanning.")]
    IntegrityTooLow { level: u8 },

    #[error("A scan is already running")]
    ScanInFlight,

    #[error("Cannot {action} while {status:?}")]
    InvalidState { action: &'static str, status: AppStatus },

    #[error("Could not resolve user '{username}': {reason}")]
    IdentityResolution { username: String, reason: String },

    #[error("No user id available for the current session")]
    NoIdentity,

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Unfollow failed: {0}")]
    Unfollow(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// How an error is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Expected outcome, logged only.
    Silent,
    /// Shown to the user; state falls back to the last valid state.
    Scoped,
    /// Rejected before any backend call.
    Guard,
    /// The session is gone and the durable pointer cleared.
    SessionInvalidating,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NoSavedSession => ErrorKind::Silent,
            AppError::Session(_) => ErrorKind::SessionInvalidating,
            AppError::NoSession
            | AppError::IntegrityTooLow { .. }
            | AppError::ScanInFlight
            | AppError::InvalidState { .. } => ErrorKind::Guard,
            AppError::IdentityResolution { .. }
            | AppError::NoIdentity
            | AppError::Scan(_)
            | AppError::Unfollow(_)
            | AppError::Backend(_)
            | AppError::Config(_) => ErrorKind::Scoped,
        }
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Backend(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AppError::NoSavedSession.kind(), ErrorKind::Silent);
        assert_eq!(AppError::Session("bad".into()).kind(), ErrorKind::SessionInvalidating);
        assert_eq!(AppError::IntegrityTooLow { level: 19 }.kind(), ErrorKind::Guard);
        assert_eq!(AppError::Scan("timeout".into()).kind(), ErrorKind::Scoped);
    }

    #[test]
    fn test_into_string_uses_display() {
        let s: String = AppError::IntegrityTooLow { level: 12 }.into();
        assert!(s.contains("12%"), "unexpected message: {}", s);
    }
}
