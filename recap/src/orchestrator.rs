//! Resolution of summarize and chat jobs against the cache and backend

use std::sync::Arc;

use async_trait::async_trait;
use recap_store::{ChatMessage, ContentCache, ConversationStore};
use tracing::{debug, info};

use crate::backend::{Completion, ModelBackend};
use crate::context::{LargeContextConfig, LargeContextProcessor};
use crate::error::Result;
use crate::prompts::PromptSet;
use crate::registry::{ChatRequest, JobOptions, JobRequest, JobResolver, JobResult, SummarizeRequest};

/// Resolution path for jobs: cache check, backend call, cache write
pub struct Orchestrator {
    cache: Arc<ContentCache>,
    contexts: Arc<ConversationStore>,
    backend: Arc<dyn ModelBackend>,
    processor: LargeContextProcessor,
    prompts: PromptSet,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<ContentCache>,
        contexts: Arc<ConversationStore>,
        backend: Arc<dyn ModelBackend>,
        context_config: LargeContextConfig,
    ) -> Self {
        Self {
            cache,
            contexts,
            processor: LargeContextProcessor::new(backend.clone(), context_config),
            backend,
            prompts: PromptSet::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub fn contexts(&self) -> &Arc<ConversationStore> {
        &self.contexts
    }

    /// Summarize a block of text in one backend call
    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<JobResult> {
        let options = &request.options;
        if let Some(hit) = self.cached(options).await {
            return Ok(hit);
        }

        let prompt = self.prompts.get(options.language);
        let messages = vec![
            ChatMessage::system(prompt.system_prompt.clone()),
            ChatMessage::user(prompt.render_user_prompt(&request.text)),
        ];

        let completion = self.backend.complete(&messages, &options.params(&prompt)).await?;
        Ok(self.remember(options, completion).await)
    }

    /// Reply to a conversation of any length
    pub async fn chat(&self, request: &ChatRequest) -> Result<JobResult> {
        if let Some(session_key) = &request.session_key {
            self.contexts.put(session_key, request.messages.clone()).await;
        }

        let options = &request.options;
        if let Some(hit) = self.cached(options).await {
            return Ok(hit);
        }

        let prompt = self.prompts.get(options.language);
        let completion = self
            .processor
            .process(&request.messages, &options.params(&prompt), options.language)
            .await?;
        Ok(self.remember(options, completion).await)
    }

    async fn cached(&self, options: &JobOptions) -> Option<JobResult> {
        if options.force_fresh {
            return None;
        }
        let resource = options.resource_key.as_deref()?;
        let entry = self.cache.get_entry(resource, options.language.code()).await?;

        info!("Cache hit for {} [{}]", resource, options.language);
        Some(JobResult {
            payload: entry.payload,
            from_cache: true,
            cached_at: Some(entry.created_at),
            model: entry.produced_by,
        })
    }

    async fn remember(&self, options: &JobOptions, completion: Completion) -> JobResult {
        if let Some(resource) = options.resource_key.as_deref() {
            self.cache
                .set(resource, options.language.code(), &completion.text, &completion.model)
                .await;
            debug!("Cached result for {} [{}]", resource, options.language);
        }

        JobResult {
            payload: completion.text,
            from_cache: false,
            cached_at: None,
            model: completion.model,
        }
    }
}

#[async_trait]
impl JobResolver for Orchestrator {
    async fn resolve(&self, request: &JobRequest) -> Result<JobResult> {
        match request {
            JobRequest::Summarize(r) => self.summarize(r).await,
            JobRequest::Chat(r) => self.chat(r).await,
        }
    }
}
