//! Model backends
//!
//! Everything that talks to a language model implements [`ModelBackend`].
//! The production setup is a [`FallbackChain`] of the typed
//! [`StructuredClient`] followed by the tolerant [`RawClient`].

pub mod chain;
pub mod error;
pub mod http;
pub mod raw;
pub mod structured;

use async_trait::async_trait;
use recap_store::ChatMessage;
use serde::{Deserialize, Serialize};

pub use chain::FallbackChain;
pub use error::BackendError;
pub use http::EndpointConfig;
pub use raw::RawClient;
pub use structured::StructuredClient;

/// Generation parameters for one completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionParams {
    /// `None` uses the backend's default model
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

/// Text produced by a backend, with the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion, BackendError>;
}
