//! Request registry
//!
//! Submissions get an id immediately and are resolved on a spawned task;
//! clients poll the id until the job reaches `completed` or `error`. A
//! periodic sweeper forgets jobs past their maximum age, finished or not.

pub mod job;
pub mod store;

pub use job::{
    generate_request_id, ChatRequest, Job, JobKind, JobOptions, JobRequest, JobResult, JobStatus,
    SummarizeRequest,
};
pub use store::{JobResolver, JobTicket, RegistryConfig, RequestRegistry};
