pub mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod estimate;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod services;

pub use api::ApiServer;
pub use backend::{BackendError, Completion, CompletionParams, FallbackChain, ModelBackend};
pub use config::AppConfig;
pub use context::{fit_to_budget, split_into_chunks, LargeContextConfig, LargeContextProcessor};
pub use error::{RecapError, Result};
pub use estimate::estimate_tokens;
pub use orchestrator::Orchestrator;
pub use prompts::{Language, PromptConfig, PromptOverrides, PromptSet};
pub use registry::{
    Job, JobRequest, JobResolver, JobResult, JobStatus, JobTicket, RegistryConfig,
    RequestRegistry,
};
pub use services::Services;
