//! Error types for SwasthyaScan.

use std::time::Duration;

use crate::assessment::AppStage;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Intake validation errors. Raised by the intake collaborator before a
/// profile ever reaches the session controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field {field} is required")]
    Required { field: &'static str },

    #[error("Field {field} is out of range: {message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },
}

/// Errors raised by the interview/report session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Network failure, timeout or provider-side error during a remote call.
    #[error("Remote model unavailable: {0}")]
    RemoteUnavailable(#[from] LlmError),

    /// The structured report did not parse or violated a field invariant.
    #[error("Malformed report: {reason}")]
    MalformedReport { reason: String },

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: AppStage, to: AppStage },

    #[error("Operation requires stage {expected}, session is in {actual}")]
    WrongStage { expected: AppStage, actual: AppStage },

    #[error("A remote call is already in flight for this session")]
    TurnInFlight,

    #[error("The interview is already complete")]
    InterviewComplete,

    #[error("The interview has already started")]
    InterviewAlreadyStarted,

    #[error("The session was reset while the call was in flight")]
    SessionReset,

    #[error("Turn text must not be empty")]
    EmptyTurn,

    #[error("Invalid patient profile: {0}")]
    InvalidProfile(#[from] ValidationError),
}

impl SessionError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedReport {
            reason: reason.into(),
        }
    }

    /// Whether this error comes from the remote model (transport or payload)
    /// rather than from misuse of the controller.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::MalformedReport { .. }
        )
    }
}
