//! In-memory job registry
//!
//! Submitted jobs run on their own task; pollers read the latest state by id.
//! Finished jobs older than the configured age are swept periodically.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::job::{generate_request_id, Job, JobRequest, JobResult};
use crate::error::{RecapError, Result};

type JobMap = Arc<RwLock<HashMap<String, Job>>>;

/// Turns a job description into a result
#[async_trait]
pub trait JobResolver: Send + Sync {
    async fn resolve(&self, request: &JobRequest) -> Result<JobResult>;
}

/// Registry lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Jobs older than this are swept whatever their status
    pub max_age: Duration,
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Handle to a dispatched job
///
/// Dropping it does not cancel the job.
pub struct JobTicket {
    pub id: String,
    handle: JoinHandle<()>,
}

impl JobTicket {
    /// Wait for the job's routine to finish
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!("Job routine for {} ended abnormally: {}", self.id, e);
        }
    }
}

/// In-memory table of asynchronous jobs
pub struct RequestRegistry {
    jobs: JobMap,
    resolver: Arc<dyn JobResolver>,
    config: RegistryConfig,
}

impl RequestRegistry {
    pub fn new(resolver: Arc<dyn JobResolver>, config: RegistryConfig) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a pending job and start resolving it in the background
    pub async fn submit(&self, request: JobRequest) -> JobTicket {
        let id = generate_request_id();
        let job = Job::new(id.clone(), request.kind(), request.origin());

        self.jobs.write().await.insert(id.clone(), job);
        info!("Submitted {:?} job {}", request.kind(), id);

        let handle = tokio::spawn(run_job(
            self.jobs.clone(),
            self.resolver.clone(),
            id.clone(),
            request,
        ));

        JobTicket { id, handle }
    }

    /// Snapshot of a job
    pub async fn get_status(&self, id: &str) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RecapError::JobNotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop every job older than `max_age`, returning how many went
    pub async fn sweep(&self) -> usize {
        sweep_jobs(&self.jobs, self.config.max_age).await
    }

    /// Sweep on a fixed period until the handle is aborted
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        let RegistryConfig {
            max_age,
            sweep_interval,
        } = self.config;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(sweep_interval).await;
                sweep_jobs(&jobs, max_age).await;
            }
        })
    }
}

async fn sweep_jobs(jobs: &JobMap, max_age: Duration) -> usize {
    let max_age = chrono::Duration::milliseconds(max_age.as_millis().min(i64::MAX as u128) as i64);
    let now = Utc::now();

    let mut jobs = jobs.write().await;
    let before = jobs.len();
    jobs.retain(|_, job| job.age_at(now) <= max_age);
    let removed = before - jobs.len();

    if removed > 0 {
        info!("Swept {} expired job(s), {} remaining", removed, jobs.len());
    }
    removed
}

/// Apply `update` if the job still exists
async fn update_job(jobs: &JobMap, id: &str, update: impl FnOnce(&mut Job) -> bool) -> bool {
    let mut jobs = jobs.write().await;
    match jobs.get_mut(id) {
        Some(job) => update(job),
        None => {
            debug!("Job {} no longer registered, dropping update", id);
            false
        }
    }
}

async fn run_job(jobs: JobMap, resolver: Arc<dyn JobResolver>, id: String, request: JobRequest) {
    if !update_job(&jobs, &id, Job::start).await {
        return;
    }

    let outcome = AssertUnwindSafe(resolver.resolve(&request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) => {
            if update_job(&jobs, &id, |job| job.complete(result)).await {
                info!("Job {} completed", id);
            }
        }
        Ok(Err(e)) => {
            let message = e.job_message();
            warn!("Job {} failed: {}", id, message);
            update_job(&jobs, &id, |job| job.fail(message)).await;
        }
        Err(_) => {
            error!("Job {} panicked during resolution", id);
            update_job(&jobs, &id, |job| job.fail("Internal error while processing the request")).await;
        }
    }
}
