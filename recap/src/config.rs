//! Application configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment
//! (`RECAP_API_KEY`, `RECAP_API_BASE`, `RECAP_MODEL`, after reading `.env`).
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! ```yaml
//! server:
//!   port: 8765
//! backend:
//!   apiBase: http://localhost:11434/v1
//!   model: llama3.1
//! registry:
//!   maxAgeMinutes: 30
//! prompts:
//!   zh:
//!     temperature: 0.5
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::{EndpointConfig, FallbackChain, ModelBackend, RawClient, StructuredClient};
use crate::context::LargeContextConfig;
use crate::prompts::{Language, PromptOverrides, PromptSet};
use crate::registry::RegistryConfig;

pub const ENV_API_KEY: &str = "RECAP_API_KEY";
pub const ENV_API_BASE: &str = "RECAP_API_BASE";
pub const ENV_MODEL: &str = "RECAP_MODEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub registry: RegistrySettings,
    pub context: LargeContextConfig,
    pub prompts: HashMap<Language, PromptOverrides>,
    /// Where the key-value records live; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    pub api_base: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    /// Retry failed calls through the raw client
    pub raw_fallback: bool,
    /// Path of the raw client's endpoint under `api_base`
    pub raw_path: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            raw_fallback: true,
            raw_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    pub max_age_minutes: u64,
    pub sweep_interval_minutes: u64,
    /// CLI polling period
    pub poll_interval_ms: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_age_minutes: 30,
            sweep_interval_minutes: 5,
            poll_interval_ms: 500,
        }
    }
}

impl RegistrySettings {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_age: Duration::from_secs(self.max_age_minutes * 60),
            sweep_interval: Duration::from_secs(self.sweep_interval_minutes.max(1) * 60),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

impl AppConfig {
    /// Load `path` (if given), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.backend.api_key = key;
        }
        if let Some(base) = lookup(ENV_API_BASE) {
            self.backend.api_base = base;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.backend.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.api_base.trim().is_empty() {
            anyhow::bail!("backend.apiBase must not be empty");
        }
        if self.backend.model.trim().is_empty() {
            anyhow::bail!("backend.model must not be empty");
        }
        self.context.validate()?;
        Ok(())
    }

    /// Configured data dir, else `<platform data dir>/recap`, else `./data`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("recap")))
            .unwrap_or_else(|| PathBuf::from("./data"))
    }

    pub fn prompt_set(&self) -> PromptSet {
        PromptSet::new(&self.prompts)
    }

    /// Structured client, followed by the raw client when enabled
    pub fn build_backend(&self) -> Arc<dyn ModelBackend> {
        let endpoint = EndpointConfig::new(
            &self.backend.api_base,
            &self.backend.api_key,
            &self.backend.model,
        );

        let mut backends: Vec<Arc<dyn ModelBackend>> =
            vec![Arc::new(StructuredClient::new(endpoint.clone()))];
        if self.backend.raw_fallback {
            let raw = match &self.backend.raw_path {
                Some(path) => RawClient::with_path(endpoint, path),
                None => RawClient::new(endpoint),
            };
            backends.push(Arc::new(raw));
        }

        Arc::new(FallbackChain::new(backends))
    }
}
