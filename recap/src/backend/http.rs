//! Shared plumbing for the HTTP model clients

use reqwest::{Client, Response};
use tracing::warn;

use super::BackendError;

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub api_base: String,
    pub api_key: String,
    pub default_model: String,
}

impl EndpointConfig {
    pub fn new(api_base: &str, api_key: &str, default_model: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            default_model: default_model.to_string(),
        }
    }

    /// `api_base` joined with `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// The requested model, or the endpoint default
    pub fn model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
    }

    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }
}

pub fn client() -> Client {
    Client::new()
}

pub fn transport_error(e: reqwest::Error) -> BackendError {
    BackendError::Network(e.to_string())
}

/// Read the body, turning non-success statuses into classified errors
pub async fn read_body(response: Response, client_name: &str) -> Result<String, BackendError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        warn!("{} got HTTP {}: {}", client_name, status, text);
        return Err(BackendError::from_status(status.as_u16(), &text));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_cleanly() {
        let config = EndpointConfig::new("http://localhost:8080/v1/", "", "m");
        assert_eq!(config.url("/chat/completions"), "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.url("chat/completions"), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_model_falls_back_to_default() {
        let config = EndpointConfig::new("http://x", "", "default-model");
        assert_eq!(config.model(None), "default-model");
        assert_eq!(config.model(Some("  ")), "default-model");
        assert_eq!(config.model(Some("other")), "other");
    }
}
