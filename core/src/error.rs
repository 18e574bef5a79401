use std::time::Duration;

use thiserror::Error;

use crate::models::JobId;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error types for the agent platform client.
///
/// These cover every failure a wizard submission or a tracked job can run
/// into, from local validation to transport failures and jobs the backend
/// reported as failed. Each variant maps to a coarse [`ErrorClass`] that the
/// presentation layer uses to pick a message, while the variant itself keeps
/// the detail for logging.
///
/// # Examples
///
/// ```rust
/// use agent_core::error::{AgentError, ErrorClass};
///
/// let err = AgentError::http(503, "backend overloaded");
/// assert!(err.is_transient());
/// assert_eq!(err.class(), ErrorClass::Network);
/// assert_eq!(err.status_code(), 503);
///
/// let err = AgentError::server_reported("quota exceeded");
/// assert_eq!(err.class(), ErrorClass::Server);
/// assert_eq!(err.to_string(), "quota exceeded");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Local validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network unreachable, connection reset or request timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the backend
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The backend reported the job as failed
    #[error("{0}")]
    ServerReported(String),

    /// Polling budget exhausted before the job reached a terminal status
    #[error("Job {job_id} did not finish after {attempts} polls ({elapsed:?})")]
    Timeout {
        job_id: JobId,
        attempts: u32,
        elapsed: Duration,
    },

    /// No active session to authenticate the request with
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    /// Response body did not match the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation is not legal in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    Network,
    Server,
    Timeout,
    Auth,
    Protocol,
    Internal,
}

impl AgentError {
    /// Create an HTTP error from a status code and message
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a server-reported job failure
    pub fn server_reported(message: impl Into<String>) -> Self {
        Self::ServerReported(message.into())
    }

    /// Create a validation error for an empty required field
    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("Field '{field}' cannot be empty"))
    }

    /// Create a protocol error for an unrecognised job status string
    pub fn unknown_status(status: &str) -> Self {
        Self::Protocol(format!("Unknown job status: '{status}'"))
    }

    /// Create an error for a job response that carried no identifier
    pub fn missing_job_id() -> Self {
        Self::Protocol("Response did not contain a job identifier".to_string())
    }

    /// Errors worth retrying on the next poll tick
    pub fn is_transient(&self) -> bool {
        match self {
            AgentError::Network(_) => true,
            AgentError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error indicates a validation problem
    pub fn is_validation(&self) -> bool {
        matches!(self, AgentError::Validation(_))
    }

    /// Check if this error was reported by the backend for a failed job
    pub fn is_server_reported(&self) -> bool {
        matches!(self, AgentError::ServerReported(_))
    }

    /// Check if this error is a polling timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout { .. })
    }

    /// Classify the error for presentation
    pub fn class(&self) -> ErrorClass {
        match self {
            AgentError::Validation(_) => ErrorClass::Validation,
            AgentError::Http { status: 400 | 422, .. } => ErrorClass::Validation,
            AgentError::Http { status: 401 | 403, .. } => ErrorClass::Auth,
            AgentError::Unauthorized(_) => ErrorClass::Auth,
            AgentError::Network(_) | AgentError::Http { .. } => ErrorClass::Network,
            AgentError::ServerReported(_) => ErrorClass::Server,
            AgentError::Timeout { .. } => ErrorClass::Timeout,
            AgentError::Protocol(_) => ErrorClass::Protocol,
            AgentError::InvalidState(_)
            | AgentError::Configuration(_)
            | AgentError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Convert to an HTTP status code equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            AgentError::Validation(_) => 400,
            AgentError::Http { status, .. } => *status,
            AgentError::Unauthorized(_) => 401,
            AgentError::InvalidState(_) => 409,
            AgentError::Network(_) => 503,
            AgentError::Timeout { .. } => 504,
            AgentError::Protocol(_) => 502,
            AgentError::ServerReported(_)
            | AgentError::Configuration(_)
            | AgentError::Internal(_) => 500,
        }
    }
}
