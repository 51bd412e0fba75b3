//! Ordered fallback across model backends

use std::sync::Arc;

use async_trait::async_trait;
use recap_store::ChatMessage;
use tracing::{debug, warn};

use super::{BackendError, Completion, CompletionParams, ModelBackend};

/// Ordered list of backends tried one after another
///
/// The first success wins. When every backend fails, the last error is
/// returned, so callers see the most forgiving client's verdict.
pub struct FallbackChain {
    backends: Vec<Arc<dyn ModelBackend>>,
}

impl FallbackChain {
    pub fn new(backends: Vec<Arc<dyn ModelBackend>>) -> Self {
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[async_trait]
impl ModelBackend for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion, BackendError> {
        let mut last_error = BackendError::NoBackend;

        for (attempt, backend) in self.backends.iter().enumerate() {
            match backend.complete(messages, params).await {
                Ok(completion) => {
                    if attempt > 0 {
                        debug!("Backend '{}' succeeded after {} failure(s)", backend.name(), attempt);
                    }
                    return Ok(completion);
                }
                Err(e) => {
                    if attempt + 1 < self.backends.len() {
                        warn!("Backend '{}' failed, falling back: {}", backend.name(), e);
                    } else {
                        warn!("Backend '{}' failed, no fallback left: {}", backend.name(), e);
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
