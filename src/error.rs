//! Error types for inbox triage.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Per-message classifier failures.
///
/// The coordinator absorbs both kinds by falling back to the rule classifier,
/// so these never reach a caller of the batch API.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Upstream model call failed: {0}")]
    Upstream(String),

    #[error("Model reply could not be parsed: {0}")]
    MalformedReply(String),
}

impl From<LlmError> for ClassifyError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse { .. } => Self::MalformedReply(err.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Batch-level failures surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Invalid request format: {0}")]
    InvalidInput(String),

    #[error("Batch processing failed: {0}")]
    Internal(String),
}
