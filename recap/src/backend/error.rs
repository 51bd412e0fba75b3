//! Classified backend failures

use thiserror::Error;

/// Longest slice of an upstream error body kept in a message
const MAX_BODY_SNIPPET: usize = 300;

/// Failure of a single model backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Quota or rate limit exceeded (status {status}): {message}")]
    Quota { status: u16, message: String },

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No model backend configured")]
    NoBackend,
}

impl BackendError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = snippet(body);
        match status {
            401 | 403 => BackendError::Auth { status, message },
            402 | 429 => BackendError::Quota { status, message },
            500..=599 => BackendError::Server { status, message },
            _ => BackendError::Rejected { status, message },
        }
    }

    /// Hint shown to the user next to the error
    pub fn advisory(&self) -> &'static str {
        match self {
            BackendError::Auth { .. } => "check the API key and its permissions",
            BackendError::Quota { .. } => "the account quota or rate limit was hit; wait or check billing",
            BackendError::Server { .. } => "the model service is having problems; try again later",
            BackendError::Rejected { .. } => "the request was refused; check the model name and parameters",
            BackendError::Network(_) => "check the network connection and the API base URL",
            BackendError::InvalidResponse(_) => "the service answered in an unexpected format; check the API base URL",
            BackendError::NoBackend => "configure at least one model backend",
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
    cut.push_str("...");
    cut
}
