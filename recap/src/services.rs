//! Wiring of the stores, orchestrator and registry

use std::sync::Arc;

use recap_store::{ContentCache, ConversationStore, FileKv, KvStore};
use tracing::info;

use crate::backend::ModelBackend;
use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;
use crate::registry::RequestRegistry;

/// Shared handles used by the HTTP API and the CLI
pub struct Services {
    pub cache: Arc<ContentCache>,
    pub contexts: Arc<ConversationStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<RequestRegistry>,
}

impl Services {
    /// File-backed stores under the data dir and the configured backend chain
    pub async fn from_config(config: &AppConfig) -> Self {
        let store_dir = config.data_dir().join("store");
        info!("Using data directory {:?}", store_dir);

        Self::new(Arc::new(FileKv::new(store_dir)), config.build_backend(), config).await
    }

    pub async fn new(kv: Arc<dyn KvStore>, backend: Arc<dyn ModelBackend>, config: &AppConfig) -> Self {
        let cache = Arc::new(ContentCache::from_settings(kv).await);
        let contexts = Arc::new(ConversationStore::new());

        let orchestrator = Arc::new(
            Orchestrator::new(cache.clone(), contexts.clone(), backend, config.context.clone())
                .with_prompts(config.prompt_set()),
        );
        let registry = Arc::new(RequestRegistry::new(
            orchestrator.clone(),
            config.registry.registry_config(),
        ));

        Self {
            cache,
            contexts,
            orchestrator,
            registry,
        }
    }
}
