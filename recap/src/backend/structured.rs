//! Typed client for the OpenAI-compatible chat completions API

use async_trait::async_trait;
use recap_store::ChatMessage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{self, EndpointConfig};
use super::{BackendError, Completion, CompletionParams, ModelBackend};

const COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// First-line backend: strict request and response shapes
pub struct StructuredClient {
    endpoint: EndpointConfig,
    client: Client,
}

impl StructuredClient {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self {
            endpoint,
            client: http::client(),
        }
    }
}

#[async_trait]
impl ModelBackend for StructuredClient {
    fn name(&self) -> &str {
        "structured"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion, BackendError> {
        let model = self.endpoint.model(params.model.as_deref());
        let body = ChatRequest {
            model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        debug!("structured request: model={}, messages={}", model, messages.len());

        let request = self.client.post(self.endpoint.url(COMPLETIONS_PATH)).json(&body);
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(http::transport_error)?;
        let text = http::read_body(response, self.name()).await?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::InvalidResponse(format!("unparseable completion: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("completion has no content".to_string()))?;

        Ok(Completion {
            text: content,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
        })
    }
}
