//! Error handling for the planning pipeline.

use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors that can occur while turning a command into a validated plan.
///
/// Every failure path in the pipeline surfaces as one of these variants; the
/// orchestrator never panics and never returns a partially constructed plan.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlannerError {
    /// Configuration could not be loaded or is internally inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The selected provider has no resolvable credential. Detected before
    /// any network attempt.
    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(&'static str),

    /// A transient failure (HTTP 429, 5xx, or transport error) persisted
    /// through every retry attempt.
    #[error("{provider}: giving up after {attempts} attempts: {message}")]
    RetriesExhausted {
        provider: &'static str,
        attempts: u32,
        message: String,
    },

    /// A non-retryable HTTP status.
    #[error("{provider}: request failed with status {status}")]
    RequestFailed { provider: &'static str, status: u16 },

    /// HTTP 200 whose body was empty or missing the expected content
    /// structure.
    #[error("{provider}: malformed response: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    /// Model text that did not decode into the expected plan shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The configured provider and the fallback provider both failed.
    #[error("no provider produced a plan for command '{command}'")]
    AllProvidersFailed { command: String },
}
