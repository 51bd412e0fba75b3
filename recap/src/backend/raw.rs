//! Raw HTTP fallback client
//!
//! Builds the request body by hand and digs the reply text out of whatever
//! JSON comes back. It is slower to break than [`super::StructuredClient`]
//! when a provider deviates from the OpenAI response shape.

use async_trait::async_trait;
use recap_store::ChatMessage;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{self, EndpointConfig};
use super::{BackendError, Completion, CompletionParams, ModelBackend};

pub const DEFAULT_RAW_PATH: &str = "chat/completions";

pub struct RawClient {
    endpoint: EndpointConfig,
    path: String,
    client: Client,
}

impl RawClient {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self::with_path(endpoint, DEFAULT_RAW_PATH)
    }

    pub fn with_path(endpoint: EndpointConfig, path: &str) -> Self {
        Self {
            endpoint,
            path: path.to_string(),
            client: http::client(),
        }
    }

    fn request_body(model: &str, messages: &[ChatMessage], params: &CompletionParams) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": false,
        })
    }
}

/// Pull reply text out of a response body in any of the common shapes
pub fn extract_text(body: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        // Some gateways answer with bare text
        Err(_) => {
            let trimmed = body.trim();
            return (!trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('['))
                .then(|| trimmed.to_string());
        }
    };

    let candidates = [
        value.pointer("/choices/0/message/content"),
        value.pointer("/choices/0/text"),
        value.pointer("/content/0/text"),
        value.pointer("/output_text"),
        value.pointer("/message/content"),
        value.pointer("/text"),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string);
    found
}

#[async_trait]
impl ModelBackend for RawClient {
    fn name(&self) -> &str {
        "raw"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion, BackendError> {
        let model = self.endpoint.model(params.model.as_deref());
        let body = Self::request_body(model, messages, params);

        debug!("raw request to {}: model={}", self.path, model);

        let request = self
            .client
            .post(self.endpoint.url(&self.path))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(http::transport_error)?;
        let text = http::read_body(response, self.name()).await?;

        let reply = extract_text(&text)
            .ok_or_else(|| BackendError::InvalidResponse("no text found in response".to_string()))?;

        Ok(Completion {
            text: reply,
            model: model.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::mock_upstream;

    #[test]
    fn test_extract_openai_shape() {
        let body = r#"{"choices":[{"message":{"content":" Hello "}}]}"#;
        assert_eq!(extract_text(body), Some("Hello".to_string()));
    }

    #[test]
    fn test_extract_alternative_shapes() {
        assert_eq!(extract_text(r#"{"choices":[{"text":"legacy"}]}"#), Some("legacy".to_string()));
        assert_eq!(
            extract_text(r#"{"content":[{"type":"text","text":"blocks"}]}"#),
            Some("blocks".to_string())
        );
        assert_eq!(extract_text(r#"{"output_text":"flat"}"#), Some("flat".to_string()));
        assert_eq!(extract_text("plain words"), Some("plain words".to_string()));
    }

    #[test]
    fn test_extract_skips_empty_candidates() {
        let body = r#"{"choices":[{"message":{"content":""}}],"text":"fallback"}"#;
        assert_eq!(extract_text(body), Some("fallback".to_string()));
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_text(r#"{"id":"x"}"#), None);
        assert_eq!(extract_text(""), None);
        assert_eq!(extract_text("{broken json"), None);
    }

    #[test]
    fn test_request_body_shape() {
        let params = CompletionParams {
            model: None,
            max_tokens: 64,
            temperature: 0.5,
        };
        let body = RawClient::request_body("m", &[ChatMessage::system("s"), ChatMessage::user("u")], &params);

        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
        assert_eq!(body["max_tokens"], 64);
    }

    #[tokio::test]
    async fn test_tolerates_nonstandard_reply() {
        let base = mock_upstream("/chat/completions", 200, r#"{"output_text":"done"}"#).await;
        let client = RawClient::new(EndpointConfig::new(&base, "", "raw-model"));

        let completion = client
            .complete(&[ChatMessage::user("hi")], &CompletionParams::default())
            .await
            .unwrap();

        assert_eq!(completion.text, "done");
        assert_eq!(completion.model, "raw-model");
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let base = mock_upstream("/chat/completions", 502, "bad gateway").await;
        let client = RawClient::new(EndpointConfig::new(&base, "", "raw-model"));

        let err = client
            .complete(&[ChatMessage::user("hi")], &CompletionParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Server { status: 502, .. }));
    }
}
