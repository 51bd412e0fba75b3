//! Error types for job orchestration
//!
//! Backend failures travel up unchanged through the large-context processor
//! and the registry; the registry turns them into a job's `error` message
//! with advisory text attached (see [`RecapError::job_message`]).

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum RecapError {
    /// Upstream model call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Nothing to send: the conversation produced no chunks
    #[error("No chunks to process: the conversation is empty")]
    ChunkingExhausted,

    /// Polled an id that was never issued or was already swept
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Invalid configuration or request values
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RecapError>;

impl RecapError {
    /// Human-readable message stored on a failed job
    pub fn job_message(&self) -> String {
        match self {
            RecapError::Backend(e) => format!("{} ({})", e, e.advisory()),
            other => other.to_string(),
        }
    }
}
