//! Routing and processing of conversations of any length
//!
//! Short histories go out in one trimmed call. Long ones are sent chunk by
//! chunk, each chunk preceded by a summary that is rolled forward after
//! every chunk.

use std::sync::Arc;

use recap_store::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::budget::{fit_to_budget, TRUNCATION_MARKER};
use super::chunk::split_into_chunks;
use crate::backend::{Completion, CompletionParams, ModelBackend};
use crate::error::{RecapError, Result};
use crate::estimate::{char_len, estimate_messages, CHARS_PER_TOKEN};
use crate::prompts::Language;

/// Limits for the large-context processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LargeContextConfig {
    /// Histories estimated above this many tokens take the chunked path
    pub chunk_threshold_tokens: usize,
    pub chunk_size_chars: usize,
    /// Budget handed to `fit_to_budget` on every backend call
    pub context_window_tokens: usize,
    pub summary_max_tokens: u32,
}

impl Default for LargeContextConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_tokens: 100_000,
            chunk_size_chars: 50_000,
            context_window_tokens: 32_000,
            summary_max_tokens: 1024,
        }
    }
}

impl LargeContextConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_chars == 0 {
            return Err(RecapError::Config("chunk_size_chars must be greater than 0".to_string()));
        }
        if self.context_window_tokens == 0 {
            return Err(RecapError::Config(
                "context_window_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which path a history takes through the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRoute {
    Direct,
    Chunked,
}

pub struct LargeContextProcessor {
    backend: Arc<dyn ModelBackend>,
    config: LargeContextConfig,
}

impl LargeContextProcessor {
    pub fn new(backend: Arc<dyn ModelBackend>, config: LargeContextConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &LargeContextConfig {
        &self.config
    }

    pub fn route(&self, messages: &[ChatMessage]) -> ContextRoute {
        if estimate_messages(messages) > self.config.chunk_threshold_tokens {
            ContextRoute::Chunked
        } else {
            ContextRoute::Direct
        }
    }

    /// Complete a conversation of any length
    pub async fn process(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
        language: Language,
    ) -> Result<Completion> {
        if messages.is_empty() {
            return Err(RecapError::ChunkingExhausted);
        }

        match self.route(messages) {
            ContextRoute::Direct => self.complete_direct(messages, params).await,
            ContextRoute::Chunked => self.complete_chunked(messages, params, language).await,
        }
    }

    async fn complete_direct(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion> {
        let fitted = fit_to_budget(messages, self.config.context_window_tokens);
        if fitted.len() < messages.len() {
            debug!("Trimmed conversation from {} to {} messages", messages.len(), fitted.len());
        }
        Ok(self.backend.complete(&fitted, params).await?)
    }

    async fn complete_chunked(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
        language: Language,
    ) -> Result<Completion> {
        let chunks = split_into_chunks(messages, self.config.chunk_size_chars);
        info!(
            "Processing {} messages in {} chunks (~{} tokens)",
            messages.len(),
            chunks.len(),
            estimate_messages(messages)
        );

        let system_prompt = messages.first().filter(|m| m.is_system());
        let mut summary: Option<String> = None;
        // Transcript not yet folded into `summary`
        let mut pending = String::new();
        let mut last = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let mut batch = Vec::with_capacity(chunk.messages.len() + 2);
            if index > 0 {
                batch.extend(system_prompt.cloned());
                let rolled = self
                    .rolling_summary(summary.as_deref(), &pending, params, language)
                    .await;
                if let Some(next) = rolled {
                    summary = Some(next);
                    pending.clear();
                }
                if let Some(summary) = &summary {
                    batch.push(ChatMessage::system(language.summary_wrapper(summary)));
                }
            }
            batch.extend(chunk.messages.iter().cloned());

            debug!("Sending chunk {}/{} ({} chars)", index + 1, chunks.len(), chunk.size_chars);
            last = Some(self.complete_direct(&batch, params).await?);

            if !pending.is_empty() {
                pending.push('\n');
            }
            pending.push_str(&chunk.transcript());
        }

        last.ok_or(RecapError::ChunkingExhausted)
    }

    /// Fold `transcript` into the previous summary; `None` when the backend fails
    ///
    /// When the transcript alone would overflow the context window its oldest
    /// part is dropped, so the newest chunk is always summarized.
    async fn rolling_summary(
        &self,
        previous: Option<&str>,
        transcript: &str,
        params: &CompletionParams,
        language: Language,
    ) -> Option<String> {
        let mut request = Vec::with_capacity(2);
        request.extend(previous.map(|s| ChatMessage::system(language.summary_wrapper(s))));

        let window = self.config.context_window_tokens;
        let usable_tokens =
            (window - window / 3).saturating_sub(estimate_messages(&request));
        let overhead = char_len(&language.rolling_summary_prompt("")) + char_len(TRUNCATION_MARKER);
        let max_chars = (usable_tokens * CHARS_PER_TOKEN).saturating_sub(overhead);
        request.push(ChatMessage::user(
            language.rolling_summary_prompt(&keep_tail(transcript, max_chars)),
        ));
        let request = fit_to_budget(&request, window);

        let summary_params = CompletionParams {
            model: params.model.clone(),
            max_tokens: self.config.summary_max_tokens,
            temperature: params.temperature,
        };

        match self.backend.complete(&request, &summary_params).await {
            Ok(completion) => Some(completion.text),
            Err(e) => {
                warn!("Rolling summary failed, continuing without it: {}", e);
                None
            }
        }
    }
}

/// Last `max_chars` chars of `text`, marked when anything was cut
fn keep_tail(text: &str, max_chars: usize) -> String {
    let len = char_len(text);
    if len <= max_chars {
        return text.to_string();
    }
    let mut kept = String::from(TRUNCATION_MARKER);
    kept.extend(text.chars().skip(len - max_chars));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::backend::BackendError;

    fn small_config() -> LargeContextConfig {
        LargeContextConfig {
            chunk_threshold_tokens: 10,
            chunk_size_chars: 40,
            context_window_tokens: 1000,
            summary_max_tokens: 64,
        }
    }

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| ChatMessage::user(format!("{}{}", i, "w".repeat(39))))
            .collect()
    }

    #[test]
    fn test_route_threshold() {
        let processor = LargeContextProcessor::new(
            Arc::new(ScriptedBackend::replying("m")),
            LargeContextConfig::default(),
        );

        assert_eq!(processor.route(&[ChatMessage::user("short")]), ContextRoute::Direct);
        // Exactly at the threshold stays direct
        assert_eq!(
            processor.route(&[ChatMessage::user("x".repeat(400_000))]),
            ContextRoute::Direct
        );
        assert_eq!(
            processor.route(&[ChatMessage::user("x".repeat(600_000))]),
            ContextRoute::Chunked
        );
    }

    #[tokio::test]
    async fn test_direct_path_single_call() {
        let backend = Arc::new(ScriptedBackend::new("m", vec![Ok("answer".to_string())]));
        let processor = LargeContextProcessor::new(backend.clone(), small_config());

        let completion = processor
            .process(&[ChatMessage::user("hi")], &CompletionParams::default(), Language::En)
            .await
            .unwrap();

        assert_eq!(completion.text, "answer");
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_chunked_path_rolls_summaries_forward() {
        let backend = Arc::new(ScriptedBackend::new(
            "m",
            vec![
                Ok("chunk 0 reply".to_string()),
                Ok("summary one".to_string()),
                Ok("chunk 1 reply".to_string()),
                Ok("summary two".to_string()),
                Ok("final reply".to_string()),
            ],
        ));
        let processor = LargeContextProcessor::new(backend.clone(), small_config());

        let completion = processor
            .process(&history(3), &CompletionParams::default(), Language::En)
            .await
            .unwrap();
        assert_eq!(completion.text, "final reply");

        let calls = backend.calls();
        assert_eq!(calls.len(), 5);

        // First chunk goes out alone
        assert_eq!(calls[0], history(3)[..1].to_vec());

        // Second chunk carries the first summary
        assert_eq!(calls[2][0], ChatMessage::system(Language::En.summary_wrapper("summary one")));
        assert_eq!(calls[2][1], history(3)[1]);

        // The second summary folds the latest chunk into the first summary
        assert_eq!(calls[3][0], ChatMessage::system(Language::En.summary_wrapper("summary one")));
        let summary_request = &calls[3][1].content;
        assert!(summary_request.contains(&history(3)[1].transcript_line()));
        assert!(!summary_request.contains(&history(3)[0].content));
        assert!(!summary_request.contains(&history(3)[2].content));
    }

    #[tokio::test]
    async fn test_failed_summary_keeps_transcript_for_next_attempt() {
        let backend = Arc::new(ScriptedBackend::new(
            "m",
            vec![
                Ok("chunk 0 reply".to_string()),
                Err(BackendError::Network("reset".to_string())),
                Ok("chunk 1 reply".to_string()),
                Ok("summary".to_string()),
                Ok("final reply".to_string()),
            ],
        ));
        let processor = LargeContextProcessor::new(backend.clone(), small_config());

        processor
            .process(&history(3), &CompletionParams::default(), Language::En)
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls[3].len(), 1);
        assert!(calls[3][0].content.contains(&history(3)[0].transcript_line()));
        assert!(calls[3][0].content.contains(&history(3)[1].transcript_line()));
    }

    #[tokio::test]
    async fn test_system_prompt_sent_with_every_chunk() {
        let backend = Arc::new(ScriptedBackend::replying("m"));
        let config = LargeContextConfig {
            chunk_size_chars: 60,
            ..small_config()
        };
        let processor = LargeContextProcessor::new(backend.clone(), config);
        let mut messages = vec![ChatMessage::system("be brief")];
        messages.extend(history(2));

        processor
            .process(&messages, &CompletionParams::default(), Language::En)
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], messages[..2].to_vec());
        assert_eq!(
            calls[2],
            vec![
                messages[0].clone(),
                ChatMessage::system(Language::En.summary_wrapper("reply from m")),
                messages[2].clone(),
            ]
        );
    }

    #[test]
    fn test_keep_tail() {
        assert_eq!(keep_tail("abcdef", 10), "abcdef");
        assert_eq!(keep_tail("abcdef", 2), format!("{}ef", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_failed_summary_is_skipped() {
        let backend = Arc::new(ScriptedBackend::new(
            "m",
            vec![
                Ok("chunk 0 reply".to_string()),
                Err(BackendError::Server {
                    status: 500,
                    message: "boom".to_string(),
                }),
                Ok("last".to_string()),
            ],
        ));
        let processor = LargeContextProcessor::new(backend.clone(), small_config());

        let completion = processor
            .process(&history(2), &CompletionParams::default(), Language::Zh)
            .await
            .unwrap();

        assert_eq!(completion.text, "last");
        let calls = backend.calls();
        assert_eq!(calls[2], vec![history(2)[1].clone()]);
    }

    #[tokio::test]
    async fn test_chunk_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new(
            "m",
            vec![Err(BackendError::Quota {
                status: 429,
                message: "limit".to_string(),
            })],
        ));
        let processor = LargeContextProcessor::new(backend, small_config());

        let err = processor
            .process(&history(3), &CompletionParams::default(), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, RecapError::Backend(BackendError::Quota { .. })));
    }

    #[tokio::test]
    async fn test_empty_conversation_fails() {
        let processor =
            LargeContextProcessor::new(Arc::new(ScriptedBackend::replying("m")), small_config());

        let err = processor
            .process(&[], &CompletionParams::default(), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, RecapError::ChunkingExhausted));
    }

    #[test]
    fn test_config_validation() {
        assert!(LargeContextConfig::default().validate().is_ok());
        let bad = LargeContextConfig {
            chunk_size_chars: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
