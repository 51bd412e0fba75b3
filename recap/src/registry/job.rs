//! Job records and submission payloads

use chrono::{DateTime, Utc};
use rand::Rng;
use recap_store::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::CompletionParams;
use crate::prompts::{Language, PromptConfig};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Registered, routine not started yet
    Pending,
    /// Resolution in progress
    Processing,
    /// Finished with a result
    Completed,
    /// Finished with an error message
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Position in `pending -> processing -> terminal`
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Error => 2,
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Summarize,
    Chat,
}

/// Payload of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub payload: String,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    pub model: String,
}

/// One asynchronous request as seen by pollers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    /// Resource or session the job was submitted for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<String>, kind: JobKind, origin: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            origin,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Mark as processing
    pub fn start(&mut self) -> bool {
        if !self.transition(JobStatus::Processing) {
            return false;
        }
        self.started_at = Some(Utc::now());
        true
    }

    pub fn complete(&mut self, result: JobResult) -> bool {
        if !self.transition(JobStatus::Completed) {
            return false;
        }
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.transition(JobStatus::Error) {
            return false;
        }
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        true
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!("Job {}: refusing transition {:?} -> {:?}", self.id, self.status, next);
            return false;
        }
        self.status = next;
        true
    }
}

/// Options shared by every kind of submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobOptions {
    /// Cache key resource; no caching when absent
    pub resource_key: Option<String>,
    pub language: Language,
    /// Skip the cache read (the result is still written)
    pub force_fresh: bool,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl JobOptions {
    /// Request parameters, falling back to the language's prompt settings
    pub fn params(&self, prompt: &PromptConfig) -> CompletionParams {
        CompletionParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens.unwrap_or(prompt.max_tokens),
            temperature: self.temperature.unwrap_or(prompt.temperature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(flatten)]
    pub options: JobOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Context store key; the history is remembered under it
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(flatten)]
    pub options: JobOptions,
}

/// Work description handed to the registry
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Summarize(SummarizeRequest),
    Chat(ChatRequest),
}

impl JobRequest {
    pub fn summarize(text: impl Into<String>) -> Self {
        JobRequest::Summarize(SummarizeRequest {
            text: text.into(),
            options: JobOptions::default(),
        })
    }

    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        JobRequest::Chat(ChatRequest {
            messages,
            session_key: None,
            options: JobOptions::default(),
        })
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Summarize(_) => JobKind::Summarize,
            JobRequest::Chat(_) => JobKind::Chat,
        }
    }

    pub fn options(&self) -> &JobOptions {
        match self {
            JobRequest::Summarize(r) => &r.options,
            JobRequest::Chat(r) => &r.options,
        }
    }

    /// Resource key, else session key
    pub fn origin(&self) -> Option<String> {
        match self {
            JobRequest::Summarize(r) => r.options.resource_key.clone(),
            JobRequest::Chat(r) => r
                .options
                .resource_key
                .clone()
                .or_else(|| r.session_key.clone()),
        }
    }

    /// Reject payloads that can never produce a result
    pub fn validate(&self) -> Result<(), String> {
        match self {
            JobRequest::Summarize(r) if r.text.trim().is_empty() => {
                Err("text must not be empty".to_string())
            }
            JobRequest::Chat(r) if r.messages.is_empty() => {
                Err("messages must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// `req_<unix millis>_<9 random base36 chars>`
pub fn generate_request_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("req_{}_{}", Utc::now().timestamp_millis(), suffix)
}
